use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Read};
use std::rc::Rc;
use std::sync::Arc;

use hex::decode;
use pretty_assertions::assert_eq;

use crate::binary::IonType;
use crate::error::{IonError, ProtocolError, SymbolError};
use crate::reader::{BufferConfiguration, IonReader, ReaderBuilder, SeekableReader, SpanProvider};
use crate::symbols::{SharedSymbolTable, SimpleCatalog, SymbolTable, SymbolToken};

/// A byte source that test code keeps feeding after handing it to a cursor.
///
/// Reading from it while it is empty fails with `WouldBlock` until it is closed, after which it
/// reports end of file.
#[derive(Clone, Default)]
pub(crate) struct SharedInput {
    state: Rc<RefCell<SharedState>>,
}

#[derive(Default)]
struct SharedState {
    bytes: VecDeque<u8>,
    closed: bool,
}

impl SharedInput {
    pub(crate) fn new() -> SharedInput {
        SharedInput::default()
    }

    pub(crate) fn push(&self, bytes: &[u8]) {
        self.state.borrow_mut().bytes.extend(bytes);
    }

    pub(crate) fn close(&self) {
        self.state.borrow_mut().closed = true;
    }
}

impl Read for SharedInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.borrow_mut();
        if state.bytes.is_empty() {
            return if state.closed {
                Ok(0)
            } else {
                Err(io::ErrorKind::WouldBlock.into())
            };
        }
        let count = buf.len().min(state.bytes.len());
        for (slot, byte) in buf.iter_mut().zip(state.bytes.drain(..count)) {
            *slot = byte;
        }
        Ok(count)
    }
}

fn incremental(input: &SharedInput) -> IonReader {
    ReaderBuilder::new()
        .with_incremental_reading_enabled(true)
        .build_from_reader(input.clone())
}

// $ion_symbol_table::{symbols: ["a", "b"]}
const DECLARE_A_B: &str = "e98183d687b481618162";
// $ion_symbol_table::{imports: $ion_symbol_table, symbols: ["c"]}
const APPEND_C: &str = "ea8183d786710387b28163";

fn hex(parts: &[&str]) -> Vec<u8> {
    decode(parts.concat()).unwrap()
}

/// $ion_symbol_table::{symbols: ["a", ... 20 times]} followed by $10
fn oversized_directive() -> Vec<u8> {
    let mut bytes = hex(&["e00100ea", "eeaf8183deab87bea8"]);
    for _ in 0..20 {
        bytes.extend(hex(&["8161"]));
    }
    bytes.extend(hex(&["710a"]));
    bytes
}

/// Describes every value of a struct holding scalar strings, as `field=value` pairs.
fn describe_struct(reader: &mut IonReader) -> Vec<String> {
    let mut fields = Vec::new();
    reader.step_in().unwrap();
    while let Some(ion_type) = reader.next().unwrap() {
        assert_eq!(ion_type, IonType::String);
        let name = reader.field_name().unwrap().unwrap();
        fields.push(format!("{}={}", name, reader.string_value().unwrap()));
    }
    reader.step_out().unwrap();
    fields
}

mod streaming {
    use super::*;
    use pretty_assertions::assert_eq;

    /// {name: "aaa...a"} with a 200 byte string, so that both length subfields take two octets.
    fn long_struct() -> Vec<u8> {
        let mut bytes = hex(&["e00100ea", "de01cc", "84", "8e01c8"]);
        bytes.extend(vec![b'a'; 200]);
        bytes
    }

    #[test]
    fn split_inside_a_length_subfield() {
        pretty_env_logger::try_init().ok();
        let bytes = long_struct();

        let mut whole = ReaderBuilder::new().build_from_bytes(bytes.clone());
        assert_eq!(whole.next().unwrap(), Some(IonType::Struct));
        let expected = describe_struct(&mut whole);

        let input = SharedInput::new();
        let mut reader = incremental(&input);
        // the version marker, the struct's type descriptor and the first octet of its length
        input.push(&bytes[..6]);
        assert_eq!(reader.next().unwrap(), None);
        input.push(&bytes[6..]);
        assert_eq!(reader.next().unwrap(), Some(IonType::Struct));
        assert_eq!(describe_struct(&mut reader), expected);
        assert_eq!(reader.next().unwrap(), None);

        reader.end_stream();
        assert_eq!(reader.next().unwrap(), None);
        reader.close().unwrap();
    }

    #[test]
    fn value_body_arrives_later() {
        pretty_env_logger::try_init().ok();
        let input = SharedInput::new();
        let mut reader = incremental(&input);
        input.push(&hex(&["e00100ea", "85", "6865"]));
        assert_eq!(reader.next().unwrap(), None);
        assert_eq!(reader.ion_type(), None);
        input.push(b"llo");
        assert_eq!(reader.next().unwrap(), Some(IonType::String));
        assert_eq!(reader.string_value().unwrap(), "hello");
    }

    #[test]
    fn one_byte_at_a_time() {
        let bytes = hex(&["e00100ea", DECLARE_A_B, "710b", "2101"]);
        let input = SharedInput::new();
        let mut reader = incremental(&input);
        let mut seen = Vec::new();
        for byte in &bytes {
            input.push(&[*byte]);
            if let Some(ion_type) = reader.next().unwrap() {
                seen.push(ion_type);
                if ion_type == IonType::Symbol {
                    assert_eq!(reader.string_value().unwrap(), "b");
                }
            }
        }
        assert_eq!(seen, vec![IonType::Symbol, IonType::Int]);
    }

    #[test]
    fn oversized_values_are_skipped() {
        pretty_env_logger::try_init().ok();
        let input = SharedInput::new();
        let mut reader = ReaderBuilder::new()
            .with_incremental_reading_enabled(true)
            .with_buffer_configuration(BufferConfiguration::new(16, 16).unwrap())
            .build_from_reader(input.clone());
        // a 64 byte string, then 7
        let mut bytes = hex(&["e00100ea", "8ec0"]);
        bytes.extend(vec![b's'; 64]);
        bytes.extend(hex(&["2107"]));
        input.push(&bytes);

        assert_eq!(reader.next().unwrap(), Some(IonType::Int));
        assert_eq!(reader.i64_value().unwrap(), 7);
        assert_eq!(reader.next().unwrap(), None);
    }

    #[test]
    fn oversized_symbol_table_directive() {
        let input = SharedInput::new();
        let mut reader = ReaderBuilder::new()
            .with_incremental_reading_enabled(true)
            .with_buffer_configuration(BufferConfiguration::new(16, 16).unwrap())
            .build_from_reader(input.clone());
        input.push(&oversized_directive());
        assert!(matches!(
            reader.next(),
            Err(IonError::Oversized {
                length: 49,
                maximum: 16
            })
        ));
    }

    #[test]
    fn close_with_an_incomplete_value() {
        let input = SharedInput::new();
        let mut reader = incremental(&input);
        // a string whose length subfield never arrives
        input.push(&hex(&["e00100ea", "8e"]));
        assert_eq!(reader.next().unwrap(), None);
        assert!(matches!(
            reader.close(),
            Err(IonError::Truncation { offset: 5 })
        ));
    }

    #[test]
    fn end_of_stream_with_an_incomplete_value() {
        let input = SharedInput::new();
        let mut reader = incremental(&input);
        input.push(&hex(&["e00100ea", "8568"]));
        assert_eq!(reader.next().unwrap(), None);
        reader.end_stream();
        assert!(matches!(reader.next(), Err(IonError::Truncation { .. })));
    }
}

mod blocking {
    use super::*;
    use pretty_assertions::assert_eq;

    fn blocking(bytes: Vec<u8>, configuration: BufferConfiguration) -> IonReader {
        ReaderBuilder::new()
            .with_buffer_configuration(configuration)
            .build_from_reader(io::Cursor::new(bytes))
    }

    #[test]
    fn values_are_filled_when_accessed() {
        // {name: "x", version: "y"}
        let bytes = hex(&["e00100ea", "d6", "848178", "858179"]);
        let mut reader = blocking(bytes, BufferConfiguration::new(2, 64).unwrap());
        assert!(!reader.is_incremental());
        assert_eq!(reader.next().unwrap(), Some(IonType::Struct));
        assert_eq!(
            describe_struct(&mut reader),
            vec!["name=x".to_string(), "version=y".to_string()]
        );
        assert_eq!(reader.next().unwrap(), None);
    }

    #[test]
    fn truncated_value() {
        let mut reader = blocking(hex(&["e00100ea", "8568"]), BufferConfiguration::default());
        assert_eq!(reader.next().unwrap(), Some(IonType::String));
        assert!(matches!(
            reader.string_value(),
            Err(IonError::Truncation { offset: 6 })
        ));
    }

    #[test]
    fn oversized_value_fails_when_accessed() {
        let mut bytes = hex(&["e00100ea", "8a"]);
        bytes.extend(vec![b'o'; 10]);
        bytes.extend(hex(&["2101"]));
        let mut reader = blocking(bytes, BufferConfiguration::new(4, 8).unwrap());
        assert_eq!(reader.next().unwrap(), Some(IonType::String));
        assert!(matches!(
            reader.string_value(),
            Err(IonError::Oversized {
                length: 11,
                maximum: 8
            })
        ));
        assert_eq!(reader.next().unwrap(), Some(IonType::Int));
        assert_eq!(reader.i64_value().unwrap(), 1);
    }

    #[test]
    fn oversized_annotated_value_fails_when_accessed() {
        // name::"oooooooooo" then 1
        let mut bytes = hex(&["e00100ea", "ed81848a"]);
        bytes.extend(vec![b'o'; 10]);
        bytes.extend(hex(&["2101"]));
        let mut reader = blocking(bytes, BufferConfiguration::new(4, 8).unwrap());
        assert_eq!(reader.next().unwrap(), Some(IonType::String));
        assert_eq!(reader.annotations().unwrap(), vec!["name".to_string()]);
        assert!(matches!(
            reader.string_value(),
            Err(IonError::Oversized {
                length: 14,
                maximum: 8
            })
        ));
        assert_eq!(reader.next().unwrap(), Some(IonType::Int));
        assert_eq!(reader.i64_value().unwrap(), 1);
    }

    #[test]
    fn oversized_symbol_table_directive() {
        let mut reader = blocking(
            oversized_directive(),
            BufferConfiguration::new(16, 16).unwrap(),
        );
        assert!(matches!(
            reader.next(),
            Err(IonError::Oversized {
                length: 49,
                maximum: 16
            })
        ));
    }
}

mod symbol_tables {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn append_keeps_existing_sids() {
        pretty_env_logger::try_init().ok();
        let bytes = hex(&["e00100ea", DECLARE_A_B, "710b", APPEND_C, "710c", "710a"]);
        let mut reader = ReaderBuilder::new().build_from_bytes(bytes);

        assert_eq!(reader.next().unwrap(), Some(IonType::Symbol));
        assert_eq!(reader.symbol_value().unwrap(), SymbolToken::new("b", 11));
        let declared = reader.current_symbol_table();
        assert_eq!(declared.find_symbol("a"), Some(10));
        assert_eq!(declared.max_id(), 11);

        assert_eq!(reader.next().unwrap(), Some(IonType::Symbol));
        assert_eq!(reader.symbol_value().unwrap(), SymbolToken::new("c", 12));
        let appended = reader.current_symbol_table();
        assert!(appended.same_table(&declared));
        assert_eq!(appended.find_symbol("a"), Some(10));
        assert_eq!(appended.find_symbol("b"), Some(11));
        assert_eq!(appended.max_id(), 12);

        assert_eq!(reader.next().unwrap(), Some(IonType::Symbol));
        assert_eq!(reader.string_value().unwrap(), "a");
    }

    #[test]
    fn append_over_the_system_table_starts_a_new_table() {
        let bytes = hex(&["e00100ea", APPEND_C, "710a"]);
        let mut reader = ReaderBuilder::new().build_from_bytes(bytes);
        assert_eq!(reader.next().unwrap(), Some(IonType::Symbol));
        assert_eq!(reader.string_value().unwrap(), "c");
        assert!(reader.current_symbol_table().is_local());
    }

    #[test]
    fn symbol_tables_are_passed_once() {
        let bytes = hex(&["e00100ea", DECLARE_A_B, "710a", APPEND_C, "710c"]);
        let mut reader = ReaderBuilder::new().build_from_bytes(bytes);
        assert!(matches!(
            reader.pop_passed_symbol_table(),
            Some(SymbolTable::System)
        ));
        assert!(reader.pop_passed_symbol_table().is_none());

        reader.next().unwrap();
        let passed = reader.take_symbol_table().unwrap();
        assert!(passed.is_local());
        assert!(!passed.same_table(&reader.current_symbol_table()));
        assert!(reader.pop_passed_symbol_table().is_none());

        // the append changes the reader's table in place, not the copy that was handed out
        reader.next().unwrap();
        assert!(reader.pop_passed_symbol_table().is_none());
        assert_eq!(passed.max_id(), 11);
        assert_eq!(reader.current_symbol_table().max_id(), 12);
    }

    #[test]
    fn version_marker_resets_the_symbol_table() {
        let bytes = hex(&["e00100ea", DECLARE_A_B, "710a", "e00100ea", "710a"]);
        let mut reader = ReaderBuilder::new().build_from_bytes(bytes);
        assert_eq!(reader.next().unwrap(), Some(IonType::Symbol));
        assert_eq!(reader.string_value().unwrap(), "a");
        assert_eq!(reader.next().unwrap(), Some(IonType::Symbol));
        assert!(reader.current_symbol_table().is_system());
        assert!(matches!(
            reader.symbol_value(),
            Err(IonError::Symbol(SymbolError::AboveMaxId { .. }))
        ));
        assert_eq!(reader.ion_version(), (1, 0));
    }

    #[test]
    fn version_symbols_are_skipped() {
        // $ion_1_0, $10::$ion_1_0, 1
        let bytes = hex(&["e00100ea", "7102", "e4818a7102", "2101"]);
        let mut reader = ReaderBuilder::new().build_from_bytes(bytes);
        assert_eq!(reader.next().unwrap(), Some(IonType::Symbol));
        assert!(reader.has_annotations());
        assert!(matches!(
            reader.annotations(),
            Err(IonError::Symbol(SymbolError::AboveMaxId { .. }))
        ));
        assert_eq!(reader.symbol_value().unwrap(), SymbolToken::new("$ion_1_0", 2));
        assert_eq!(reader.next().unwrap(), Some(IonType::Int));
    }

    #[test]
    fn mismatched_import_becomes_a_substitute() {
        let catalog = SimpleCatalog::new();
        catalog.put_table(SharedSymbolTable::new(
            "s",
            2,
            vec![
                Some("x".to_string()),
                Some("y".to_string()),
                Some("z".to_string()),
            ],
        ));
        // $ion_symbol_table::{imports: [{name: "s", version: 1, max_id: 2}]}, then $11
        let bytes = hex(&[
            "e00100ea",
            "ee8f8183dc86ba",
            "d9848173852101882102",
            "710b",
        ]);
        let mut reader = ReaderBuilder::new()
            .with_catalog(Arc::new(catalog))
            .build_from_bytes(bytes);
        assert_eq!(reader.next().unwrap(), Some(IonType::Symbol));
        assert_eq!(reader.string_value().unwrap(), "y");

        let table = reader.current_symbol_table();
        assert_eq!(table.max_id(), 11);
        assert_eq!(table.find_symbol("z"), None);
        let imported = table.as_local().unwrap().imported_tables();
        assert!(imported[0].is_substitute());
        assert_eq!((imported[0].version(), imported[0].max_id()), (1, 2));
    }
}

mod spans {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn hoist_reinstalls_the_symbol_table() {
        let bytes = hex(&["e00100ea", DECLARE_A_B, "710a", "e00100ea", "2101"]);
        let mut reader = ReaderBuilder::new().build_from_bytes(bytes);
        assert_eq!(reader.next().unwrap(), Some(IonType::Symbol));
        let span = reader.current_span().unwrap();
        assert!(span.symbol_table().is_local());

        assert_eq!(reader.next().unwrap(), Some(IonType::Int));
        assert!(reader.current_symbol_table().is_system());

        reader.hoist(&span).unwrap();
        assert_eq!(reader.next().unwrap(), Some(IonType::Symbol));
        assert_eq!(reader.string_value().unwrap(), "a");
        assert_eq!(reader.next().unwrap(), None);
    }

    #[test]
    fn spans_need_a_fixed_input() {
        let input = SharedInput::new();
        input.push(&hex(&["e00100ea", "2101"]));
        let mut reader = incremental(&input);
        assert_eq!(reader.next().unwrap(), Some(IonType::Int));
        assert!(matches!(
            reader.current_span(),
            Err(IonError::Protocol(ProtocolError::SpansUnsupported))
        ));
    }
}
