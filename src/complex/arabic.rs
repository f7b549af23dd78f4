use crate::buffer::{Buffer, GlyphInfo};
use crate::plan::{ShapePlan, ShapePlanner};
use crate::unicode::{joining_type, JoiningType};
use crate::{Mask, Tag};

use super::ComplexShaper;

pub static ARABIC_SHAPER: ComplexShaper = ComplexShaper {
    collect_features: Some(collect_features),
    setup_masks: Some(setup_masks),
};

// Joining actions, in feature order.
pub(crate) mod action {
    pub const ISOL: u8 = 0;
    pub const FINA: u8 = 1;
    pub const FIN2: u8 = 2;
    pub const FIN3: u8 = 3;
    pub const MEDI: u8 = 4;
    pub const MED2: u8 = 5;
    pub const INIT: u8 = 6;
    pub const NONE: u8 = 7;
}

const ARABIC_FEATURES: &[Tag] = &[
    Tag::from_bytes(b"isol"),
    Tag::from_bytes(b"fina"),
    Tag::from_bytes(b"fin2"),
    Tag::from_bytes(b"fin3"),
    Tag::from_bytes(b"medi"),
    Tag::from_bytes(b"med2"),
    Tag::from_bytes(b"init"),
];

/// Per-action feature masks, `NONE` last.
#[derive(Clone, Copy, Debug, Default)]
pub struct ArabicShapePlan {
    pub mask_array: [Mask; ARABIC_FEATURES.len() + 1],
}

fn collect_features(planner: &mut ShapePlanner) {
    let mut plan = ArabicShapePlan::default();
    for (i, tag) in ARABIC_FEATURES.iter().enumerate() {
        plan.mask_array[i] = planner.allocate_mask(*tag);
    }

    planner.arabic = Some(plan);
}

// One entry per state and joining type column: previous glyph action,
// current glyph action, next state.
#[rustfmt::skip]
const STATE_TABLE: &[[(u8, u8, u16); 6]] = {
    use action::*;
    &[
        //  U                L                R                D                ALAPH            DALATH/RISH

        // State 0: prev was U, not willing to join.
        [(NONE, NONE, 0), (NONE, ISOL, 2), (NONE, ISOL, 1), (NONE, ISOL, 2), (NONE, ISOL, 1), (NONE, ISOL, 6)],

        // State 1: prev was R or ISOL/ALAPH, not willing to join.
        [(NONE, NONE, 0), (NONE, ISOL, 2), (NONE, ISOL, 1), (NONE, ISOL, 2), (NONE, FIN2, 5), (NONE, ISOL, 6)],

        // State 2: prev was D/L in ISOL form, willing to join.
        [(NONE, NONE, 0), (NONE, ISOL, 2), (INIT, FINA, 1), (INIT, FINA, 3), (INIT, FINA, 4), (INIT, FINA, 6)],

        // State 3: prev was D in FINA form, willing to join.
        [(NONE, NONE, 0), (NONE, ISOL, 2), (MEDI, FINA, 1), (MEDI, FINA, 3), (MEDI, FINA, 4), (MEDI, FINA, 6)],

        // State 4: prev was FINA ALAPH, not willing to join.
        [(NONE, NONE, 0), (NONE, ISOL, 2), (MED2, ISOL, 1), (MED2, ISOL, 2), (MED2, FIN2, 5), (MED2, ISOL, 6)],

        // State 5: prev was FIN2/FIN3 ALAPH, not willing to join.
        [(NONE, NONE, 0), (NONE, ISOL, 2), (ISOL, ISOL, 1), (ISOL, ISOL, 2), (ISOL, FIN2, 5), (ISOL, ISOL, 6)],

        // State 6: prev was DALATH/RISH, not willing to join.
        [(NONE, NONE, 0), (NONE, ISOL, 2), (NONE, ISOL, 1), (NONE, ISOL, 2), (NONE, FIN3, 5), (NONE, ISOL, 6)],
    ]
};

/// Returns the table column of a joining type, `None` for transparent ones.
fn column(t: JoiningType) -> Option<usize> {
    match t {
        JoiningType::U => Some(0),
        JoiningType::L => Some(1),
        JoiningType::R => Some(2),
        JoiningType::D => Some(3),
        JoiningType::Alaph => Some(4),
        JoiningType::DalathRish => Some(5),
        JoiningType::T => None,
    }
}

// States that can still hand an action to the previous glyph.
fn has_pending_action(state: u16) -> bool {
    (2..=5).contains(&state)
}

// Joining types that may join to the previous glyph.
fn joins_right(column: usize) -> bool {
    column >= 2
}

fn arabic_joining(buffer: &mut Buffer) {
    let mut prev: Option<usize> = None;
    let mut state = 0;

    // Check pre-context.
    for &c in &buffer.context[0] {
        let this_type = match column(joining_type(c)) {
            Some(v) => v,
            None => continue,
        };

        state = STATE_TABLE[usize::from(state)][this_type].2;
        break;
    }

    for i in 0..buffer.len {
        let this_type = match column(joining_type(buffer.info[i].as_char())) {
            Some(v) => v,
            None => {
                buffer.info[i].joining_action = action::NONE;
                continue;
            }
        };

        let (prev_action, curr_action, next_state) = STATE_TABLE[usize::from(state)][this_type];

        match prev {
            Some(prev) if prev_action != action::NONE => {
                buffer.info[prev].joining_action = prev_action;
                buffer.safe_to_insert_tatweel(Some(prev), Some(i + 1));
            }
            Some(prev) => {
                if joins_right(this_type) || has_pending_action(state) {
                    buffer.unsafe_to_concat(Some(prev), Some(i + 1));
                }
            }
            None => {
                if joins_right(this_type) {
                    buffer.unsafe_to_concat_from_outbuffer(Some(0), Some(i + 1));
                }
            }
        }

        buffer.info[i].joining_action = curr_action;

        prev = Some(i);
        state = next_state;
    }

    // Check post-context.
    for &c in &buffer.context[1] {
        let this_type = match column(joining_type(c)) {
            Some(v) => v,
            None => continue,
        };

        let prev_action = STATE_TABLE[usize::from(state)][this_type].0;
        if let Some(prev) = prev {
            if prev_action != action::NONE {
                buffer.info[prev].joining_action = prev_action;
                buffer.safe_to_insert_tatweel(Some(prev), Some(buffer.len));
            } else if has_pending_action(state) {
                buffer.unsafe_to_concat(Some(prev), Some(buffer.len));
            }
        }

        break;
    }
}

fn is_mongolian_variation_selector(info: &GlyphInfo) -> bool {
    matches!(info.codepoint, 0x180B..=0x180D | 0x180F)
}

fn mongolian_variation_selectors(buffer: &mut Buffer) {
    // Copy the joining action from base to Mongolian variation selectors.
    for i in 1..buffer.len {
        if is_mongolian_variation_selector(&buffer.info[i]) {
            buffer.info[i].joining_action = buffer.info[i - 1].joining_action;
        }
    }
}

/// Assigns a joining action to every character and turns it into a mask.
pub fn setup_masks(plan: &ShapePlan, buffer: &mut Buffer) {
    arabic_joining(buffer);
    if plan.script == Some(crate::script::MONGOLIAN) {
        mongolian_variation_selectors(buffer);
    }

    let mask_array = match plan.arabic {
        Some(ref arabic) => arabic.mask_array,
        None => return,
    };

    for info in buffer.info_slice_mut() {
        info.mask |= mask_array[usize::from(info.joining_action.min(action::NONE))];
    }
}
