use crate::*;
use crate::bits::{BitReader, BitWriter};
use crate::count;
use crate::delta::{self, DeltaSpecial, DeltaToken};
use crate::matcher::{self, LineMatch, Match};
use crate::recognize::{self, HexCase};
use crate::tables::{self, HorizontalCodes, Set};

fn roundtrip(input: &[u8], preset: &Preset) -> Vec<u8> {
    let packed = compress_to_vec(input, preset).unwrap();
    decompress_to_vec(&packed, preset).unwrap()
}

fn packed_len(input: &[u8], kind: PresetKind) -> usize {
    compress_to_vec(input, kind.preset()).unwrap().len()
}

// ========== Bits ==========

#[test]
fn test_bits_write_msb_first() {
    let mut buf = [0u8; 2];
    let mut w = BitWriter::new(&mut buf);
    w.write_bits(0b101, 3).unwrap();
    w.write_bits(0b11110000_1, 9).unwrap();
    assert_eq!(w.bit_len(), 12);
    assert_eq!(w.byte_len(), 2);
    assert_eq!(w.free_bits(), 4);
    assert_eq!(buf, [0b1011_1110, 0b0001_0000]);
}

#[test]
fn test_bits_write_code_left_aligned() {
    let mut buf = [0u8; 1];
    let mut w = BitWriter::new(&mut buf);
    w.write_code(0xC0, 3).unwrap();
    w.write_code(0xFF, 0).unwrap();
    assert_eq!(w.bit_len(), 3);
    assert_eq!(buf[0], 0b1100_0000);
}

#[test]
fn test_bits_overflow_keeps_prefix() {
    let mut buf = [0u8; 1];
    let mut w = BitWriter::new(&mut buf);
    w.write_bits(0b111, 3).unwrap();
    assert!(w.write_bits(0b1010_1010, 8).is_err());
    assert_eq!(buf[0], 0b1111_0101);
}

#[test]
fn test_bits_measuring_counts_only() {
    let mut w = BitWriter::measuring();
    w.write_bits(0x1FF, 9).unwrap();
    w.write_bits(0, 20).unwrap();
    assert_eq!(w.bit_len(), 29);
    assert_eq!(w.byte_len(), 4);
}

#[test]
fn test_bits_peek_pads_with_ones() {
    let data = [0xA0];
    let mut r = BitReader::new(&data);
    assert_eq!(r.peek8(), 0xA0);
    r.skip(4).unwrap();
    assert_eq!(r.peek8(), 0x0F);
    assert_eq!(r.remaining(), 4);
}

#[test]
fn test_bits_read_past_end() {
    let data = [0xFF];
    let mut r = BitReader::new(&data);
    assert_eq!(r.read_bits(5).unwrap(), 0x1F);
    assert!(r.read_bits(4).is_err());
    assert!(r.skip(4).is_err());
    assert_eq!(r.read_bits(3).unwrap(), 0x07);
    assert!(r.read_bit().is_err());
}

#[test]
fn test_bits_read_step() {
    let data = [0b1110_1111];
    let mut r = BitReader::new(&data);
    assert_eq!(r.read_step(4).unwrap(), 3);
    assert_eq!(r.read_step(4).unwrap(), 4);
    assert_eq!(r.position(), 8);
}

// ========== Tables ==========

#[test]
fn test_tables_every_printable_classified() {
    for byte in b'!'..=b'~' {
        let sym = tables::classify(byte).unwrap_or_else(|| panic!("{} unclassified", byte as char));
        assert_eq!(tables::symbol_at(sym.set, sym.slot), byte.to_ascii_lowercase());
    }
    assert!(tables::classify(b' ').is_none());
    assert!(tables::classify(0x7F).is_none());
}

#[test]
fn test_tables_case_shares_slot() {
    let lower = tables::classify(b'e').unwrap();
    let upper = tables::classify(b'E').unwrap();
    assert_eq!(lower, upper);
    assert_eq!(lower.set, Set::Alpha);
    assert_eq!(lower.slot, 2);
}

#[test]
fn test_tables_vertical_codes_decode_back() {
    let mut buf = [0u8; 32];
    let mut w = BitWriter::new(&mut buf);
    for slot in 0..28 {
        tables::write_vertical(&mut w, slot).unwrap();
    }
    let len = w.byte_len();
    let mut r = BitReader::new(&buf[..len]);
    for slot in 0..28 {
        assert_eq!(tables::read_vertical(&mut r).unwrap(), slot);
    }
}

#[test]
fn test_tables_freq_symbol_slots() {
    assert_eq!(tables::freq_symbol(0).set, Set::Sym);
    assert_eq!(tables::freq_symbol(2).slot, tables::SYM_FREQ_BASE + 2);
    assert_eq!(tables::freq_symbol(3).set, Set::Num);
    assert_eq!(tables::freq_symbol(5).slot, tables::NUM_FREQ_BASE + 2);
}

#[test]
fn test_tables_horizontal_read_skips_disabled() {
    let h = HorizontalCodes::new([0x00, 0x40, 0x80, 0x00, 0xC0], [2, 2, 2, 0, 2]);
    assert!(h.validate().is_ok());
    assert!(!h.is_enabled(Set::Dict));
    let data = [0b1100_0000];
    let mut r = BitReader::new(&data);
    assert_eq!(h.read(&mut r).unwrap(), Some(Set::Delta));
    assert_eq!(r.position(), 2);
}

#[test]
fn test_tables_horizontal_alpha_only_consumes_nothing() {
    let h = HorizontalCodes::new([0; 5], [0; 5]);
    let data = [0xFF];
    let mut r = BitReader::new(&data);
    assert_eq!(h.read(&mut r).unwrap(), Some(Set::Alpha));
    assert_eq!(r.position(), 0);
}

#[test]
fn test_tables_horizontal_validation() {
    let overlap = HorizontalCodes::new([0x00, 0x00, 0x80, 0xC0, 0xE0], [2, 1, 2, 3, 3]);
    assert!(overlap.validate().unwrap_err().contains("overlap"));
    let stray = HorizontalCodes::new([0x10, 0x40, 0x80, 0xC0, 0xE0], [2, 2, 2, 3, 3]);
    assert!(stray.validate().is_err());
    let no_num = HorizontalCodes::new([0x00, 0x80, 0x00, 0x00, 0x00], [1, 1, 0, 0, 0]);
    assert!(no_num.validate().is_err());
    let half_alpha = HorizontalCodes::new([0x00, 0x00, 0x80, 0x00, 0x00], [0, 0, 1, 0, 0]);
    assert!(half_alpha.validate().is_err());
}

// ========== Count codec ==========

#[test]
fn test_count_tier_boundaries() {
    let values = [0, 3, 4, 19, 20, 147, 148, 2195, 2196, count::MAX_COUNT];
    let mut buf = [0u8; 64];
    let mut w = BitWriter::new(&mut buf);
    let mut bits = 0;
    for &v in &values {
        count::write_count(&mut w, v).unwrap();
        bits += count::count_cost(v);
        assert_eq!(w.bit_len(), bits);
    }
    let len = w.byte_len();
    let mut r = BitReader::new(&buf[..len]);
    for &v in &values {
        assert_eq!(count::read_count(&mut r).unwrap(), v);
    }
}

#[test]
fn test_count_costs() {
    assert_eq!(count::count_cost(0), 3);
    assert_eq!(count::count_cost(4), 6);
    assert_eq!(count::count_cost(20), 10);
    assert_eq!(count::count_cost(148), 15);
    assert_eq!(count::count_cost(count::MAX_COUNT), 20);
    assert_eq!(count::MAX_COUNT, 67731);
}

#[test]
fn test_count_truncated_field() {
    let data = [0b1100_0000];
    let mut r = BitReader::new(&data);
    assert!(count::read_count(&mut r).is_err());
}

// ========== Delta codec ==========

#[test]
fn test_delta_codepoint_and_special() {
    let mut buf = [0u8; 16];
    let mut w = BitWriter::new(&mut buf);
    delta::write_delta(&mut w, 0xE9, 0).unwrap();
    delta::write_delta(&mut w, 0xE8, 0xE9).unwrap();
    delta::write_special(&mut w, DeltaSpecial::Period).unwrap();
    delta::write_delta(&mut w, 0x1F600, 0xE8).unwrap();
    let len = w.byte_len();
    let mut r = BitReader::new(&buf[..len]);

    let first = delta::read_delta(&mut r).unwrap();
    assert_eq!(first.apply(0), Some(0xE9));
    let second = delta::read_delta(&mut r).unwrap();
    assert_eq!(second, DeltaToken::Codepoint { negative: true, magnitude: 1 });
    assert_eq!(second.apply(0xE9), Some(0xE8));
    assert_eq!(delta::read_delta(&mut r).unwrap(), DeltaToken::Special(DeltaSpecial::Period));
    assert_eq!(delta::read_delta(&mut r).unwrap().apply(0xE8), Some(0x1F600));
}

#[test]
fn test_delta_apply_rejects_ascii_and_out_of_range() {
    let down = DeltaToken::Codepoint { negative: true, magnitude: 0x70 };
    assert_eq!(down.apply(0xE9), None);
    let up = DeltaToken::Codepoint { negative: false, magnitude: 0x10 };
    assert_eq!(up.apply(0x10FFF8), None);
    assert_eq!(DeltaToken::Special(DeltaSpecial::Space).apply(0xE9), None);
}

#[test]
fn test_delta_special_bytes() {
    for byte in [b' ', b',', b'.', b'\n'] {
        assert_eq!(DeltaSpecial::for_byte(byte).and_then(DeltaSpecial::byte), Some(byte));
    }
    assert_eq!(DeltaSpecial::Switch.byte(), None);
    assert!(DeltaSpecial::for_byte(b'x').is_none());
}

#[test]
fn test_delta_utf8_helpers() {
    assert_eq!(delta::read_utf8("é".as_bytes()), Some((0xE9, 2)));
    assert_eq!(delta::read_utf8("中".as_bytes()), Some((0x4E2D, 3)));
    assert_eq!(delta::read_utf8("😀".as_bytes()), Some((0x1F600, 4)));
    assert_eq!(delta::read_utf8(b"a"), None);
    assert_eq!(delta::read_utf8(&[0xC0, 0x80]), None);
    assert_eq!(delta::read_utf8(&[0xE4, 0xB8]), None);
    assert_eq!(delta::read_utf8(&[0xF4, 0x90, 0x80, 0x80]), None);
    assert_eq!(delta::read_utf8(&[0xED, 0xA0, 0x80]), Some((0xD800, 3)));

    for cp in [0x80, 0x7FF, 0x800, 0xFFFF, 0x10000, 0x10FFFF] {
        let (buf, len) = delta::encode_utf8(cp);
        assert_eq!(delta::read_utf8(&buf[..len]), Some((cp, len)));
    }
}

// ========== Recognizers ==========

#[test]
fn test_recognize_repeat_run() {
    assert_eq!(recognize::repeat_run(b"xaaaaay", 2), Some(4));
    assert_eq!(recognize::repeat_run(b"xaaaaay", 1), None);
    assert_eq!(recognize::repeat_run(b"aaaa", 1), None);
    assert_eq!(recognize::repeat_run(b"aaaaaa", 1), Some(5));
}

#[test]
fn test_recognize_guid() {
    let lower = b"fa01b51e-7ecc-4e3e-be7b-918a4c2c891c";
    assert_eq!(recognize::guid(lower, 0), Some(HexCase::Lower));
    let upper = b"FA01B51E-7ECC-4E3E-BE7B-918A4C2C891C";
    assert_eq!(recognize::guid(upper, 0), Some(HexCase::Upper));
    let mixed = b"FA01b51e-7ecc-4e3e-be7b-918a4c2c891c";
    assert_eq!(recognize::guid(mixed, 0), None);
    assert_eq!(recognize::guid(&lower[..35], 0), None);
}

#[test]
fn test_recognize_hex_run() {
    let run = recognize::hex_run(b"deadbeef!", 0).unwrap();
    assert_eq!(run, recognize::HexRun { case: HexCase::Lower, len: 8 });
    let run = recognize::hex_run(b"CAFE1234 ", 0).unwrap();
    assert_eq!(run.case, HexCase::Upper);
    assert_eq!(run.len, 8);
    // Short digit runs stay literal; long ones pack.
    assert!(recognize::hex_run(b"1234567 ", 0).is_none());
    assert_eq!(recognize::hex_run(b"12345678901x", 0).map(|r| r.len), Some(11));
    assert!(recognize::hex_run(b"beef!", 0).is_none());
}

#[test]
fn test_recognize_template() {
    let templates = PresetKind::Default.preset().templates();
    let m = recognize::template(b"2020-12-31T12:23:59.234Z", 0, templates).unwrap();
    assert_eq!((m.index, m.matched, m.unmatched), (0, 24, 0));
    let m = recognize::template(b"2020-12-31 ok", 0, templates).unwrap();
    assert_eq!((m.index, m.matched), (1, 10));
    let m = recognize::template(b"(555) 123-45", 0, templates).unwrap();
    assert_eq!((m.index, m.matched, m.unmatched), (2, 12, 2));
    assert!(recognize::template(b"hello world", 0, templates).is_none());
}

#[test]
fn test_recognize_freq_seq_respects_enabled_sets() {
    let json = PresetKind::Json.preset();
    assert_eq!(recognize::freq_seq(b"\": \"x", 0, json), Some(0));
    let text = PresetKind::AlphaNumOnly.preset();
    assert_eq!(recognize::freq_seq(b" the cat", 0, text), None);
    assert_eq!(recognize::freq_seq(b" with", 0, text), Some(3));
}

#[test]
fn test_recognize_upper_run_and_binary() {
    assert!(recognize::upper_run_ahead(b"HELLO", 0));
    assert!(!recognize::upper_run_ahead(b"HELLo", 0));
    assert!(!recognize::upper_run_ahead(b"HELL", 0));

    assert_eq!(recognize::binary_run(b"\x00\x01\x02abc", 0), 3);
    assert_eq!(recognize::binary_run(b"\x00\xC3\xA9", 0), 1);
    assert_eq!(recognize::binary_run(b"\x01\x02\x02\x02\x02\x02", 0), 2);
}

// ========== Matcher ==========

#[test]
fn test_matcher_in_string() {
    let input = b"HELLO WORLD HELLO WORLD";
    assert_eq!(matcher::find_in_string(input, 12), Some(Match { len: 11, distance: 12 }));
    assert_eq!(matcher::find_in_string(input, 3), None);
}

#[test]
fn test_matcher_prefers_nearest_on_tie() {
    let input = b"abcde_abcde_abcde";
    assert_eq!(matcher::find_in_string(input, 12), Some(Match { len: 5, distance: 6 }));
}

#[test]
fn test_matcher_never_splits_utf8() {
    let input = b"aaaa\xC3\xA9 aaaa\xC3\xA8";
    assert_eq!(matcher::find_in_string(input, 7), None);
}

#[test]
fn test_matcher_in_lines() {
    let history: [&[u8]; 1] = [b"The quick brown fox"];
    let m = matcher::find_in_lines(b"quick brown cat", 0, &history);
    assert_eq!(m, Some(LineMatch { len: 12, position: 4, line: 1 }));
}

#[test]
fn test_matcher_in_lines_overlapping_self() {
    let m = matcher::find_in_lines(b"abababababab", 2, &[]);
    assert_eq!(m, Some(LineMatch { len: 10, position: 0, line: 0 }));
}

#[test]
fn test_matcher_in_lines_first_candidate_wins() {
    let history: [&[u8]; 2] = [b"hello there", b"hello there world"];
    let m = matcher::find_in_lines(b"hello there world", 0, &history);
    assert_eq!(m, Some(LineMatch { len: 11, position: 0, line: 1 }));
}

#[test]
fn test_matcher_in_lines_scan_offset_carries_over() {
    // Line 0 is scanned up to the cursor, so line 1 is only searched from
    // offset 11 and its leading "quick brown" is never considered.
    let history: [&[u8]; 2] = [b"quick brown fox jumps", b"a lazy dog and quick brown"];
    let m = matcher::find_in_lines(b"0123456789 quick brown", 11, &history);
    assert_eq!(m, Some(LineMatch { len: 11, position: 15, line: 2 }));

    let m = matcher::find_in_lines(b"quick brown", 0, &history);
    assert_eq!(m, Some(LineMatch { len: 11, position: 0, line: 1 }));
}

// ========== Presets ==========

#[test]
fn test_preset_builtins() {
    assert_eq!(PresetKind::ALL.len(), 17);
    for kind in PresetKind::ALL {
        let preset = kind.preset();
        assert_eq!(preset.name(), kind.name());
        assert_eq!(PresetKind::from_name(kind.name()), Some(kind));
        assert!(preset.horizontal().validate().is_ok(), "{}", kind.name());
        assert_eq!(preset.freq_seqs().len(), 6);
        assert_eq!(preset.magic_bits(), 1);
    }
    assert!(PresetKind::Default.preset().supports_unicode());
    assert!(!PresetKind::NoUni.preset().supports_unicode());
    assert!(!PresetKind::AlphaOnly.preset().is_enabled(Set::Num));
    assert!(PresetKind::from_name("nope").is_none());
}

#[test]
fn test_preset_config_roundtrip() {
    for kind in PresetKind::ALL {
        let preset = kind.preset();
        let json = serde_json::to_string(&preset.to_config()).unwrap();
        let rebuilt = PresetConfig::from_json(&json).unwrap().build().unwrap();
        assert_eq!(&rebuilt, preset);
    }
}

#[test]
fn test_preset_config_defaults_fill_in() {
    let preset = PresetConfig::from_json(r#"{"name": "short", "magic_bits": 3}"#)
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(preset.name(), "short");
    assert_eq!(preset.magic_bits(), 3);
    assert_eq!(preset.horizontal(), PresetKind::Default.preset().horizontal());
}

#[test]
fn test_preset_config_rejects_invalid() {
    let too_many = PresetConfig {
        freq_seqs: (0..7).map(|i| format!("seq{i}")).collect(),
        ..Default::default()
    };
    assert!(matches!(too_many.build(), Err(CodecError::InvalidPreset(_))));

    let empty = PresetConfig { templates: vec![String::new()], ..Default::default() };
    assert!(matches!(empty.build(), Err(CodecError::InvalidPreset(_))));

    let magic = PresetConfig { magic_bits: 9, ..Default::default() };
    assert!(matches!(magic.build(), Err(CodecError::InvalidPreset(_))));

    let bad_json = PresetConfig::from_json("{ not json");
    assert!(matches!(bad_json, Err(CodecError::Config(_))));
}

#[test]
fn test_preset_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("urls.json");
    let config = PresetConfig { name: "urls".into(), ..PresetKind::Url.preset().to_config() };
    std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

    let preset = PresetConfig::load(&path).unwrap();
    assert_eq!(preset.name(), "urls");
    assert_eq!(preset.freq_seqs(), PresetKind::Url.preset().freq_seqs());

    let missing = PresetConfig::load(dir.path().join("missing.json")).unwrap_err();
    assert!(missing.to_string().contains("reading preset"));
}

#[test]
fn test_preset_with_magic_bits() {
    let preset = Preset::default().with_magic_bits(0).unwrap();
    assert_eq!(preset.magic_bits(), 0);
    assert!(Preset::default().with_magic_bits(12).is_err());
}

// ========== Encoder / decoder ==========

#[test]
fn test_codec_hello_vector() {
    let packed = compress_to_vec(b"Hello", &Preset::default()).unwrap();
    assert_eq!(packed, [0x87, 0x67, 0xC7, 0x14]);
    assert_eq!(decompress_to_vec(&packed, &Preset::default()).unwrap(), b"Hello");
}

#[test]
fn test_codec_empty_input() {
    let packed = compress_to_vec(b"", &Preset::default()).unwrap();
    assert_eq!(packed.len(), 1);
    assert!(decompress_to_vec(&packed, &Preset::default()).unwrap().is_empty());

    let bare = Preset::default().with_magic_bits(0).unwrap();
    assert!(compress_to_vec(b"", &bare).unwrap().is_empty());
    assert!(decompress_to_vec(&[], &bare).unwrap().is_empty());
}

#[test]
fn test_codec_repeat_runs() {
    let dashes = vec![b'-'; 36];
    assert_eq!(packed_len(&dashes, PresetKind::Default), 4);
    let dashes = vec![b'-'; 72];
    assert_eq!(packed_len(&dashes, PresetKind::Default), 4);
    assert_eq!(roundtrip(&dashes, &Preset::default()), dashes);
}

#[test]
fn test_codec_guid_and_datetime() {
    let guid = b"fa01b51e-7ecc-4e3e-be7b-918a4c2c891c";
    assert_eq!(packed_len(guid, PresetKind::Default), 18);
    assert_eq!(roundtrip(guid, &Preset::default()), guid);

    let upper = b"FA01B51E-7ECC-4E3E-BE7B-918A4C2C891C";
    assert_eq!(roundtrip(upper, &Preset::default()), upper);

    let stamp = b"2020-12-31T12:23:59.234Z";
    assert!(packed_len(stamp, PresetKind::Default) <= 9);
    assert_eq!(roundtrip(stamp, &Preset::default()), stamp);
}

#[test]
fn test_codec_back_reference_helps() {
    let text = b"HELLO WORLD HELLO WORLD";
    assert!(packed_len(text, PresetKind::Default) < packed_len(text, PresetKind::NoDict));
    assert_eq!(roundtrip(text, PresetKind::NoDict.preset()), text);
    assert_eq!(roundtrip(text, &Preset::default()), text);
}

/// Writes the expected tokens and checks `packed` against them bit for bit.
/// The free bits of the last byte belong to the terminator and are skipped.
fn assert_tokens(packed: &[u8], build: impl FnOnce(&mut BitWriter<'_>)) {
    let mut buf = [0u8; 64];
    let mut w = BitWriter::new(&mut buf);
    build(&mut w);
    let (bits, bytes) = (w.bit_len(), w.byte_len());
    assert_eq!(packed.len(), bytes);
    let mut got = BitReader::new(packed);
    let mut want = BitReader::new(&buf[..bytes]);
    for i in 0..bits {
        assert_eq!(got.read_bit().unwrap(), want.read_bit().unwrap(), "bit {i}");
    }
}

fn switch(w: &mut BitWriter<'_>, set: Set) {
    tables::write_vertical(w, tables::SWITCH).unwrap();
    Preset::default().horizontal().write(w, set).unwrap();
}

fn delta_switch(w: &mut BitWriter<'_>, set: Set) {
    delta::write_special(w, DeltaSpecial::Switch).unwrap();
    Preset::default().horizontal().write(w, set).unwrap();
}

fn letters(w: &mut BitWriter<'_>, text: &[u8]) {
    for &b in text {
        tables::write_vertical(w, tables::classify(b).unwrap().slot).unwrap();
    }
}

fn codepoints(w: &mut BitWriter<'_>, text: &str, mut prev: u32) -> u32 {
    for c in text.chars() {
        delta::write_delta(w, c as u32, prev).unwrap();
        prev = c as u32;
    }
    prev
}

#[test]
fn test_codec_all_upper_ends_at_non_letter() {
    let packed = compress_to_vec(b"HELLO WORLD", &Preset::default()).unwrap();
    assert_eq!(packed, [0x80, 0x76, 0x7C, 0x71, 0x40, 0x80, 0x3D, 0xEB, 0x7C, 0x74]);
    assert_tokens(&packed, |w| {
        w.write_bits(1, 1).unwrap();
        switch(w, Set::Alpha);
        switch(w, Set::Alpha);
        letters(w, b"HELLO");
        // The space leaves all-upper; W enters it again.
        switch(w, Set::Alpha);
        tables::write_vertical(w, tables::ALPHA_SPACE).unwrap();
        switch(w, Set::Alpha);
        switch(w, Set::Alpha);
        letters(w, b"WORLD");
    });
    assert_eq!(decompress_to_vec(&packed, &Preset::default()).unwrap(), b"HELLO WORLD");

    let samples: [&[u8]; 4] = [b"HELLO-WORLD", b"ABCDE1abc", b"SHOUT, THEN quiet", b"UPPER\xc3\xa9"];
    for text in samples {
        assert_eq!(roundtrip(text, &Preset::default()), text);
    }
}

#[test]
fn test_codec_delta_space_escape() {
    let text = "\u{3b1}\u{3b2}\u{3b3} \u{3b4}\u{3b5}\u{3b6}";
    let packed = compress_to_vec(text.as_bytes(), &Preset::default()).unwrap();
    assert_eq!(packed.len(), 9);
    assert_tokens(&packed, |w| {
        w.write_bits(1, 1).unwrap();
        switch(w, Set::Alpha);
        tables::write_vertical(w, tables::ALPHA_SPACE).unwrap();
        let prev = codepoints(w, "\u{3b1}\u{3b2}\u{3b3}", 0);
        w.write_bits(0b11111_0, 6).unwrap();
        codepoints(w, "\u{3b4}\u{3b5}\u{3b6}", prev);
    });
    assert_eq!(decompress_to_vec(&packed, &Preset::default()).unwrap(), text.as_bytes());
}

#[test]
fn test_codec_back_reference_inside_delta() {
    // The copy leaves DELTA active, and the codepoints after it continue
    // from the last coded one.
    let text = "\u{41f}\u{440}\u{438}\u{432}\u{435}\u{442} \u{43c}\u{438}\u{440}, \u{41f}\u{440}\u{438}\u{432}\u{435}\u{442} \u{43c}\u{438}\u{440}\u{43e}\u{43a}";
    let packed = compress_to_vec(text.as_bytes(), &Preset::default()).unwrap();
    assert_tokens(&packed, |w| {
        w.write_bits(1, 1).unwrap();
        switch(w, Set::Alpha);
        tables::write_vertical(w, tables::ALPHA_SPACE).unwrap();
        let prev = codepoints(w, "\u{41f}\u{440}\u{438}\u{432}\u{435}\u{442}", 0);
        delta::write_special(w, DeltaSpecial::Space).unwrap();
        let prev = codepoints(w, "\u{43c}\u{438}\u{440}", prev);
        delta::write_special(w, DeltaSpecial::Comma).unwrap();
        delta::write_special(w, DeltaSpecial::Space).unwrap();
        delta_switch(w, Set::Dict);
        count::write_count(w, 19 - 5).unwrap();
        count::write_count(w, 21 - 4).unwrap();
        codepoints(w, "\u{43e}\u{43a}", prev);
    });
    assert_eq!(decompress_to_vec(&packed, &Preset::default()).unwrap(), text.as_bytes());
}

#[test]
fn test_codec_unencodable_reports_position() {
    let err = compress_to_vec(b"abc1", PresetKind::AlphaOnly.preset()).unwrap_err();
    assert!(matches!(err, CodecError::Unencodable { position: 3, byte: b'1' }));

    let err = compress_to_vec("caf\u{e9}".as_bytes(), PresetKind::NoUni.preset()).unwrap_err();
    assert!(matches!(err, CodecError::Unencodable { position: 3, byte: 0xC3 }));
}

#[test]
fn test_codec_compress_overflow() {
    let text = b"The quick brown fox jumps over the lazy dog";
    let full = compress_to_vec(text, &Preset::default()).unwrap();
    for cap in 0..full.len() {
        let mut buf = vec![0u8; cap];
        let err = compress(text, &mut buf, &Preset::default()).unwrap_err();
        assert!(err.is_overflow());
        assert!(matches!(err, CodecError::Overflow { needed, capacity } if needed == full.len() && capacity == cap));
        assert_eq!(buf, full[..cap]);
    }
}

#[test]
fn test_codec_decompress_overflow() {
    let text = b"Overflowing buffers keep their prefix, 12345 and all.";
    let packed = compress_to_vec(text, &Preset::default()).unwrap();
    for cap in [0, 1, 10, text.len() - 1] {
        let mut out = vec![0u8; cap];
        let err = decompress(&packed, &mut out, &Preset::default()).unwrap_err();
        assert!(matches!(err, CodecError::Overflow { needed, .. } if needed == text.len()));
        assert_eq!(out, text[..cap]);
    }
}

#[test]
fn test_codec_terminator_pads_toward_num() {
    // 29 bits of tokens ending in NUM: the terminator fills the rest with ones.
    let packed = compress_to_vec(b"12345", &Preset::default()).unwrap();
    assert_eq!(packed.len(), 4);
    assert_eq!(packed[3] & 0x07, 0x07);
    assert_eq!(decompress_to_vec(&packed, &Preset::default()).unwrap(), b"12345");
}

#[test]
fn test_codec_magic_detection() {
    let packed = compress_to_vec(b"magic", &Preset::default()).unwrap();
    assert!(has_magic(&packed, &Preset::default()));
    assert!(!has_magic(&[0x7F], &Preset::default()));
    assert!(!has_magic(&[], &Preset::default()));
}

// ========== Line history ==========

#[test]
fn test_history_bounded_most_recent_first() {
    let mut history = LineHistory::new(2);
    assert!(history.is_empty());
    history.push(b"one");
    history.push(b"two");
    history.push(b"three");
    assert_eq!(history.len(), 2);
    assert_eq!(history.get(0), Some(&b"three"[..]));
    assert_eq!(history.get(1), Some(&b"two"[..]));
    assert_eq!(history.get(2), None);
    history.clear();
    assert!(history.is_empty());
}

#[test]
fn test_history_lines_roundtrip() {
    let lines: [&[u8]; 4] = [
        b"GET /api/v1/users/42 HTTP/1.1",
        b"GET /api/v1/users/43 HTTP/1.1",
        b"POST /api/v1/users HTTP/1.1",
        b"GET /api/v1/users/42 HTTP/1.1",
    ];
    let preset = Preset::default();
    let mut enc = LineHistory::default();
    let mut dec = LineHistory::default();
    let mut sizes = Vec::new();
    for line in lines {
        let mut packed = [0u8; 64];
        let n = enc.compress_line(line, &mut packed, &preset).unwrap();
        sizes.push(n);
        let mut out = [0u8; 64];
        let m = dec.decompress_line(&packed[..n], &mut out, &preset).unwrap();
        assert_eq!(&out[..m], line);
    }
    assert!(sizes[3] < sizes[0]);
    assert_eq!(enc.lines(), dec.lines());
}
