mod shaping_impl;
use shaping_impl::shape;

use aatbuzz::tables::aat::{ExtendedStateTable, Lookup, LookupSegment, LookupSingle, StateEntry};
use aatbuzz::tables::{kerx, morx, Tables};
use aatbuzz::{Face, GlyphId};

// Glyph ids of the test faces.
const A: u16 = 1;
const V: u16 = 2;
const LAM: u16 = 3;
const ALEF: u16 = 4;
const F: u16 = 10;
const I: u16 = 11;
const FI: u16 = 20;

// State table entry flags.
const SET_MARK: u16 = 0x8000;
const MARK_FIRST: u16 = 0x8000;
const MARK_LAST: u16 = 0x2000;
const DONT_ADVANCE: u16 = 0x4000;

fn base_tables() -> Tables {
    let mut tables = Tables::default();
    for (c, g) in [('a', A), ('v', V), ('\u{0644}', LAM), ('\u{0627}', ALEF), ('f', F), ('i', I)] {
        tables.cmap.insert(c, GlyphId(g));
    }

    let mut advances = vec![0; 21];
    advances[usize::from(A)] = 500;
    advances[usize::from(V)] = 600;
    advances[usize::from(LAM)] = 300;
    advances[usize::from(ALEF)] = 200;
    advances[usize::from(F)] = 300;
    advances[usize::from(I)] = 250;
    advances[usize::from(FI)] = 520;
    tables.metrics.advances = advances;
    tables
}

fn face(f: impl FnOnce(&mut Tables)) -> Face {
    let mut tables = base_tables();
    f(&mut tables);
    Face::new(1000, 21, tables)
}

fn chain(subtable: morx::SubtableKind) -> morx::Chain {
    chain_of(vec![subtable])
}

fn chain_of(subtables: Vec<morx::SubtableKind>) -> morx::Chain {
    morx::Chain {
        default_flags: 1,
        features: Vec::new(),
        subtables: subtables
            .into_iter()
            .map(|kind| morx::Subtable { kind, coverage: morx::Coverage(0), feature_flags: 1 })
            .collect(),
    }
}

fn morx_face(subtables: Vec<morx::SubtableKind>) -> Face {
    face(|t| t.morx = Some(morx::Table { chains: vec![chain_of(subtables)] }))
}

fn contextual_entry(
    new_state: u16,
    flags: u16,
    mark_index: u16,
    current_index: u16,
) -> StateEntry<morx::ContextualEntryData> {
    StateEntry {
        new_state,
        flags,
        extra: morx::ContextualEntryData { mark_index, current_index },
    }
}

fn a_to_fi() -> Vec<Lookup> {
    vec![Lookup::SingleTable(vec![LookupSingle { glyph: A, value: FI }])]
}

/// `v` sets the mark and an `a` right after it becomes `fi`.
fn mark_then_substitute() -> morx::SubtableKind {
    morx::SubtableKind::Contextual(morx::ContextualSubtable {
        state: ExtendedStateTable {
            number_of_classes: 6,
            classes: Lookup::Simple(vec![0, 5, 4]),
            states: vec![vec![0, 0, 0, 0, 1, 0], vec![0, 0, 0, 0, 1, 2]],
            entries: vec![
                contextual_entry(0, 0, 0xFFFF, 0xFFFF),
                contextual_entry(1, SET_MARK, 0xFFFF, 0xFFFF),
                contextual_entry(0, 0, 0xFFFF, 0),
            ],
        },
        lookups: a_to_fi(),
    })
}

/// Marks `v` without ever inserting anything.
fn mark_only_insertion() -> morx::SubtableKind {
    let nothing = morx::InsertionEntryData {
        current_insert_index: 0xFFFF,
        marked_insert_index: 0xFFFF,
    };

    morx::SubtableKind::Insertion(morx::InsertionSubtable {
        state: ExtendedStateTable {
            number_of_classes: 5,
            classes: Lookup::Simple(vec![0, 4, 4]),
            states: vec![vec![0, 0, 0, 0, 1], vec![0, 0, 0, 0, 1]],
            entries: vec![
                StateEntry { new_state: 0, flags: 0, extra: nothing },
                StateEntry { new_state: 1, flags: SET_MARK, extra: nothing },
            ],
        },
        glyphs: Vec::new(),
    })
}

fn fi_ligature() -> morx::SubtableKind {
    morx::SubtableKind::Ligature(morx::LigatureSubtable {
        state: ExtendedStateTable {
            number_of_classes: 6,
            classes: Lookup::SegmentSingle(vec![
                LookupSegment { first: F, last: F, value: 4 },
                LookupSegment { first: I, last: I, value: 5 },
            ]),
            states: vec![vec![0, 0, 0, 0, 1, 0], vec![0, 0, 0, 0, 1, 2]],
            entries: vec![
                StateEntry { new_state: 0, flags: 0, extra: 0 },
                // Set component.
                StateEntry { new_state: 1, flags: 0x8000, extra: 0 },
                // Set component and perform action.
                StateEntry { new_state: 0, flags: 0x8000 | 0x2000, extra: 0 },
            ],
        },
        ligature_actions: vec![
            (-(I as i32) as u32) & 0x3FFFFFFF,
            0x80000000 | ((-(F as i32) as u32) & 0x3FFFFFFF),
        ],
        components: vec![0],
        ligatures: vec![GlyphId(FI)],
    })
}

fn ligature_face() -> Face {
    face(|t| t.morx = Some(morx::Table { chains: vec![chain(fi_ligature())] }))
}

fn pair_kerning_face() -> Face {
    face(|t| {
        t.kerx = Some(kerx::Table {
            subtables: vec![kerx::Subtable {
                coverage: kerx::Coverage(0),
                tuple_count: 0,
                format: kerx::Format::Format0(kerx::PairTable {
                    pairs: vec![kerx::KerningPair { left: GlyphId(A), right: GlyphId(V), value: -40 }],
                }),
            }],
        })
    })
}

#[test]
fn empty_buffer() {
    assert_eq!(shape(&ligature_face(), "", ""), "");
}

#[test]
fn unmapped_characters_become_notdef() {
    assert_eq!(shape(&ligature_face(), "a?", ""), "1=0+500|0=1+0");
}

#[test]
fn ligature_replaces_components() {
    assert_eq!(shape(&ligature_face(), "fia", ""), "20=0+520|1=2+500");
}

#[test]
fn ligature_keeps_deleted_glyph_on_request() {
    assert_eq!(
        shape(&ligature_face(), "fia", "--keep-deleted"),
        "20=0+520|65535=0+0|1=2+500"
    );
}

#[test]
fn ligature_needs_both_components() {
    assert_eq!(shape(&ligature_face(), "fa", ""), "10=0+300|1=1+500");
}

#[test]
fn pair_kerning() {
    assert_eq!(shape(&pair_kerning_face(), "av", ""), "1=0+480|2=1@-20,0+580");
}

#[test]
fn pair_kerning_disabled_by_feature() {
    assert_eq!(shape(&pair_kerning_face(), "av", "--features=-kern"), "1=0+500|2=1+600");
}

#[test]
fn pair_kerning_over_a_cluster_range() {
    assert_eq!(
        shape(&pair_kerning_face(), "avav", "--features=-kern,kern[2:4]"),
        "1=0+500|2=1+600|1=2+480|2=3@-20,0+580"
    );
}

#[test]
fn state_machine_kerning_delta() {
    // `a` pushes itself, `v` pushes itself and pops both values.
    let face = face(|t| {
        t.kerx = Some(kerx::Table {
            subtables: vec![kerx::Subtable {
                coverage: kerx::Coverage(0),
                tuple_count: 0,
                format: kerx::Format::Format1(kerx::StateMachineTable {
                    state: ExtendedStateTable {
                        number_of_classes: 6,
                        classes: Lookup::Simple(vec![0, 4, 5]),
                        states: vec![vec![0, 0, 0, 0, 1, 0], vec![0, 0, 0, 0, 1, 2]],
                        entries: vec![
                            StateEntry { new_state: 0, flags: 0, extra: 0xFFFF },
                            StateEntry { new_state: 1, flags: 0x8000, extra: 0xFFFF },
                            StateEntry { new_state: 0, flags: 0x8000, extra: 0 },
                        ],
                    },
                    values: vec![20, -39],
                }),
            }],
        })
    });

    assert_eq!(shape(&face, "av", ""), "1=0@-40,0+460|2=1@20,0+620");
}

#[test]
fn dont_advance_loop_terminates() {
    // A rearrangement machine that never advances past `a`.
    let face = face(|t| {
        let machine = ExtendedStateTable {
            number_of_classes: 5,
            classes: Lookup::Simple(vec![0, 4]),
            states: vec![vec![0, 0, 0, 0, 1], vec![0, 0, 0, 0, 1]],
            entries: vec![
                StateEntry { new_state: 0, flags: 0, extra: () },
                StateEntry { new_state: 1, flags: 0x4000, extra: () },
            ],
        };
        t.morx = Some(morx::Table { chains: vec![chain(morx::SubtableKind::Rearrangement(machine))] });
    });

    assert_eq!(shape(&face, "aa", ""), "1=0+500|1=1+500");
}

#[test]
fn arabic_is_shaped_right_to_left() {
    let face = face(|_| {});
    // lam alef
    assert_eq!(
        shape(&face, "\u{0644}\u{0627}", "--produce-safe-to-insert-tatweel --show-flags"),
        "4=2+200#4|3=0+300"
    );
}

#[test]
fn arabic_single_glyph_gets_no_tatweel_flag() {
    let face = face(|_| {});
    // The lam joins to the following context, but there is no position
    // inside the buffer to insert a tatweel at.
    assert_eq!(
        shape(
            &face,
            "\u{0644}",
            "--pre-context=\u{0627} --post-context=\u{0644} --produce-safe-to-insert-tatweel --show-flags",
        ),
        "3=0+300"
    );
}

#[test]
fn serialization_without_advances_accumulates_offsets() {
    assert_eq!(shape(&pair_kerning_face(), "av", "--ned"), "1|2@460,0");
}

#[test]
fn contextual_substitution_is_unsafe_to_break() {
    let face = morx_face(vec![mark_then_substitute()]);
    assert_eq!(shape(&face, "va", "--show-flags"), "2=0+600|20=1+520#3");
}

#[test]
fn contextual_substitution_in_right_to_left_text() {
    // The subtable runs in layout order, so `v` is seen first.
    let face = morx_face(vec![mark_then_substitute()]);
    assert_eq!(
        shape(&face, "av", "--direction=rtl --show-flags"),
        "2=1+600#3|20=0+520"
    );
}

#[test]
fn in_place_subtable_flags_do_not_depend_on_earlier_passes() {
    let face = morx_face(vec![mark_only_insertion(), mark_then_substitute()]);
    assert_eq!(
        shape(&face, "av", "--direction=rtl --show-flags"),
        "2=1+600#3|20=0+520"
    );
}

#[test]
fn rearrangement_flags_outside_the_moved_range() {
    // `a` starts the range and `v` ends it, moving `a` to the end. A
    // following `f` is read in a state that needs the `a v` before it.
    let mut classes = vec![1; 11];
    classes[usize::from(A)] = 4;
    classes[usize::from(V)] = 5;
    classes[usize::from(F)] = 6;

    let machine = ExtendedStateTable {
        number_of_classes: 7,
        classes: Lookup::Simple(classes),
        states: vec![
            vec![0, 0, 0, 0, 1, 0, 0],
            vec![0, 0, 0, 0, 1, 2, 0],
            vec![0, 0, 0, 0, 0, 0, 3],
        ],
        entries: vec![
            StateEntry { new_state: 0, flags: 0, extra: () },
            StateEntry { new_state: 1, flags: MARK_FIRST, extra: () },
            StateEntry { new_state: 2, flags: MARK_LAST | 1, extra: () },
            StateEntry { new_state: 2, flags: 0, extra: () },
        ],
    };
    let face = morx_face(vec![morx::SubtableKind::Rearrangement(machine)]);

    // The moved glyphs share one cluster, which drops their flags.
    assert_eq!(shape(&face, "avf", "--show-flags"), "2=0+600|1=0+500|10=2+300#3");
}

#[test]
fn pending_end_of_text_action_is_unsafe_to_break() {
    // `a` sets the mark. The end of text right after it turns the mark into
    // `fi`, anything else drops back to the start state.
    let face = morx_face(vec![morx::SubtableKind::Contextual(morx::ContextualSubtable {
        state: ExtendedStateTable {
            number_of_classes: 6,
            classes: Lookup::Simple(vec![0, 4, 5]),
            states: vec![vec![0, 0, 0, 0, 1, 0], vec![2, 0, 0, 0, 1, 0]],
            entries: vec![
                contextual_entry(0, 0, 0xFFFF, 0xFFFF),
                contextual_entry(1, SET_MARK, 0xFFFF, 0xFFFF),
                contextual_entry(0, 0, 0, 0xFFFF),
            ],
        },
        lookups: a_to_fi(),
    })]);

    assert_eq!(shape(&face, "a", "--show-flags"), "20=0+520");
    // Breaking before `v` would let the end of text act on `a`.
    assert_eq!(shape(&face, "av", "--show-flags"), "1=0+500|2=1+600#3");
}

#[test]
fn dont_advance_back_to_start_is_safe_to_break() {
    let face = morx_face(vec![morx::SubtableKind::Contextual(morx::ContextualSubtable {
        state: ExtendedStateTable {
            number_of_classes: 6,
            classes: Lookup::Simple(vec![0, 4, 5]),
            states: vec![vec![0, 0, 0, 0, 1, 0], vec![0, 0, 0, 0, 1, 2]],
            entries: vec![
                contextual_entry(0, 0, 0xFFFF, 0xFFFF),
                contextual_entry(1, SET_MARK, 0xFFFF, 0xFFFF),
                contextual_entry(0, DONT_ADVANCE, 0xFFFF, 0xFFFF),
            ],
        },
        lookups: a_to_fi(),
    })]);

    assert_eq!(shape(&face, "av", "--show-flags"), "1=0+500|2=1+600");
}

#[test]
fn pair_kerning_skips_joiners() {
    assert_eq!(
        shape(&pair_kerning_face(), "a\u{200D}v", ""),
        "1=0+480|0=1+0|2=4@-20,0+580"
    );
}
