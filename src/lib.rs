/*!
`aatbuzz` applies Apple Advanced Typography layout tables (`morx`, `kerx`
and `kern`) to a run of text, in the manner of
[harfbuzz](https://github.com/harfbuzz/harfbuzz).

Tables are decoded once into a [`Face`]; shaping then maps characters to
glyphs, runs the `morx` chains and applies kerning.

```no_run
use aatbuzz::{Face, UnicodeBuffer};

let data = std::fs::read("font.ttf").unwrap();
let face = Face::from_slice(&data, 0).unwrap();

let mut buffer = UnicodeBuffer::new();
buffer.push_str("Hello");
let glyphs = aatbuzz::shape(&face, &[], buffer);
println!("{}", glyphs.serialize(aatbuzz::SerializeFlags::default()));
```
*/

#![no_std]
#![forbid(unsafe_code)]

extern crate alloc;

mod aat;
mod buffer;
mod common;
mod complex;
mod face;
pub mod int_set;
mod plan;
pub mod set_digest;
mod shape;
pub mod tables;
mod unicode;

pub use ttf_parser::{GlyphId, Tag};

pub use crate::buffer::{
    glyph_flag, BufferClusterLevel, BufferFlags, GlyphBuffer, GlyphInfo, GlyphPosition,
    SerializeFlags, UnicodeBuffer,
};
pub use crate::common::{script, Direction, Feature, Language, Script};
pub use crate::face::Face;
pub use crate::int_set::IntSet;
pub use crate::plan::ShapePlan;
pub use crate::set_digest::SetDigest;
pub use crate::shape::{shape, shape_with_plan};
pub use crate::tables::Tables;

type Mask = u32;
