//! An incremental binary Ion cursor and reader.
//!
//! Input may arrive in arbitrary chunks: the [`cursor::IonCursor`] reports that it needs more data
//! rather than failing, and resumes exactly where it stopped once more bytes are available. The
//! [`reader::IonReader`] built on top of it hides system values and resolves symbol IDs against
//! the system, shared and local symbol tables in [`symbols`].
//!
//! ```
//! use ion_cursor::binary::IonType;
//! use ion_cursor::reader::ReaderBuilder;
//!
//! // $ion_1_0 {name: "x"}
//! let bytes = vec![0xE0, 0x01, 0x00, 0xEA, 0xD3, 0x84, 0x81, 0x78];
//! let mut reader = ReaderBuilder::new().build_from_bytes(bytes);
//! assert_eq!(reader.next().unwrap(), Some(IonType::Struct));
//! reader.step_in().unwrap();
//! assert_eq!(reader.next().unwrap(), Some(IonType::String));
//! assert_eq!(reader.field_name().unwrap().as_deref(), Some("name"));
//! assert_eq!(reader.string_value().unwrap(), "x");
//! ```

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate num_derive;

pub mod binary;
pub mod cursor;
pub mod error;
pub mod reader;
pub mod symbols;
pub mod types;

#[cfg(test)]
mod tests;

pub use crate::binary::IonType;
pub use crate::error::{IonError, IonResult};
pub use crate::reader::{IonReader, ReaderBuilder};
pub use crate::symbols::{SymbolTable, SymbolToken};
