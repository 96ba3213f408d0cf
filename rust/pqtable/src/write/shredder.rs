//! Conversion of record events into per-column definition levels, repetition
//! levels and values.

use std::ops::Range;

use parquet::{
    basic::{Repetition, Type as PhysicalType},
    data_type::ByteArray,
    schema::types::Type,
};
use pqtable_common::{Error, Result, verify_arg};

use super::consumer::RecordConsumer;

/// Buffered values of one leaf column.
#[derive(Debug)]
pub enum LeafValues {
    Boolean(Vec<bool>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Binary(Vec<ByteArray>),
}

impl LeafValues {
    fn new(physical: PhysicalType) -> Result<LeafValues> {
        let values = match physical {
            PhysicalType::BOOLEAN => LeafValues::Boolean(Vec::new()),
            PhysicalType::INT32 => LeafValues::Int32(Vec::new()),
            PhysicalType::INT64 => LeafValues::Int64(Vec::new()),
            PhysicalType::FLOAT => LeafValues::Float(Vec::new()),
            PhysicalType::DOUBLE => LeafValues::Double(Vec::new()),
            PhysicalType::BYTE_ARRAY => LeafValues::Binary(Vec::new()),
            other => {
                return Err(Error::invalid_arg(
                    "schema",
                    format!("physical type {other} cannot be written"),
                ));
            }
        };
        Ok(values)
    }

    pub fn len(&self) -> usize {
        match self {
            LeafValues::Boolean(v) => v.len(),
            LeafValues::Int32(v) => v.len(),
            LeafValues::Int64(v) => v.len(),
            LeafValues::Float(v) => v.len(),
            LeafValues::Double(v) => v.len(),
            LeafValues::Binary(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn truncate(&mut self, len: usize) {
        match self {
            LeafValues::Boolean(v) => v.truncate(len),
            LeafValues::Int32(v) => v.truncate(len),
            LeafValues::Int64(v) => v.truncate(len),
            LeafValues::Float(v) => v.truncate(len),
            LeafValues::Double(v) => v.truncate(len),
            LeafValues::Binary(v) => v.truncate(len),
        }
    }
}

/// Levels and values of one leaf column, borrowed from the shredder.
pub struct ColumnData<'a> {
    pub max_def: i16,
    pub max_rep: i16,
    pub def_levels: &'a [i16],
    pub rep_levels: &'a [i16],
    pub values: &'a LeafValues,
}

struct ColumnBuffer {
    max_def: i16,
    max_rep: i16,
    def_levels: Vec<i16>,
    rep_levels: Vec<i16>,
    values: LeafValues,
    /// Entries added for the current record.
    record_entries: usize,
    /// Level and value counts when the current record started.
    record_start: (usize, usize),
}

impl ColumnBuffer {
    fn push_levels(&mut self, def: i16) {
        let rep = if self.record_entries == 0 {
            0
        } else {
            self.max_rep
        };
        self.def_levels.push(def);
        self.rep_levels.push(rep);
        self.record_entries += 1;
    }
}

struct SchemaNode {
    name: String,
    repetition: Repetition,
    /// Definition level of the node when present.
    def: i16,
    children: Vec<usize>,
    /// Leaf columns under this node.
    leaves: Range<usize>,
    physical: Option<PhysicalType>,
}

enum Frame {
    Group {
        node: usize,
        def: i16,
        started: Vec<bool>,
    },
    Field {
        node: usize,
        parent_def: i16,
        mark: u64,
        occurrences: usize,
    },
}

/// [`RecordConsumer`] shredding records into column buffers for a fixed schema.
///
/// Fields left out of a record, and groups without data, get entries whose
/// definition level is the one of their closest present ancestor.
pub struct LevelShredder {
    nodes: Vec<SchemaNode>,
    columns: Vec<ColumnBuffer>,
    frames: Vec<Frame>,
    /// Entries added across all columns since creation.
    emitted: u64,
    in_message: bool,
    records: usize,
}

impl LevelShredder {
    pub fn new(schema: &Type) -> Result<LevelShredder> {
        verify_arg!(schema, schema.is_group());
        let mut shredder = LevelShredder {
            nodes: Vec::new(),
            columns: Vec::new(),
            frames: Vec::new(),
            emitted: 0,
            in_message: false,
            records: 0,
        };
        shredder.add_node(schema, Repetition::REQUIRED, 0, 0)?;
        Ok(shredder)
    }

    fn add_node(
        &mut self,
        t: &Type,
        repetition: Repetition,
        parent_def: i16,
        parent_rep: i16,
    ) -> Result<usize> {
        let def = parent_def + (repetition != Repetition::REQUIRED) as i16;
        let rep = parent_rep + (repetition == Repetition::REPEATED) as i16;
        let index = self.nodes.len();
        let first_leaf = self.columns.len();
        self.nodes.push(SchemaNode {
            name: t.name().to_string(),
            repetition,
            def,
            children: Vec::new(),
            leaves: first_leaf..first_leaf,
            physical: None,
        });
        if t.is_group() {
            let mut children = Vec::with_capacity(t.get_fields().len());
            for field in t.get_fields() {
                let info = field.get_basic_info();
                let repetition = if info.has_repetition() {
                    info.repetition()
                } else {
                    Repetition::REQUIRED
                };
                children.push(self.add_node(field, repetition, def, rep)?);
            }
            self.nodes[index].children = children;
        } else {
            let physical = t.get_physical_type();
            self.columns.push(ColumnBuffer {
                max_def: def,
                max_rep: rep,
                def_levels: Vec::new(),
                rep_levels: Vec::new(),
                values: LeafValues::new(physical)?,
                record_entries: 0,
                record_start: (0, 0),
            });
            self.nodes[index].physical = Some(physical);
        }
        self.nodes[index].leaves = first_leaf..self.columns.len();
        Ok(index)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Number of complete records buffered since the last [`clear`](Self::clear).
    pub fn buffered_records(&self) -> usize {
        self.records
    }

    pub fn column(&self, icol: usize) -> ColumnData<'_> {
        let column = &self.columns[icol];
        ColumnData {
            max_def: column.max_def,
            max_rep: column.max_rep,
            def_levels: &column.def_levels,
            rep_levels: &column.rep_levels,
            values: &column.values,
        }
    }

    /// Drops all buffered data, keeping the allocations.
    pub fn clear(&mut self) {
        for column in &mut self.columns {
            column.def_levels.clear();
            column.rep_levels.clear();
            column.values.truncate(0);
            column.record_entries = 0;
            column.record_start = (0, 0);
        }
        self.records = 0;
    }

    /// Discards everything added for the record in progress.
    pub fn abort_message(&mut self) {
        for column in &mut self.columns {
            let (levels, values) = column.record_start;
            column.def_levels.truncate(levels);
            column.rep_levels.truncate(levels);
            column.values.truncate(values);
            column.record_entries = 0;
        }
        self.frames.clear();
        self.in_message = false;
    }

    fn emit_absent(&mut self, node: usize, def: i16) {
        for icol in self.nodes[node].leaves.clone() {
            self.columns[icol].push_levels(def);
            self.emitted += 1;
        }
    }

    /// Fills in the children of a finished group that were never started.
    fn finish_group(&mut self, node: usize, def: i16, started: &[bool]) -> Result<()> {
        for (i, &child) in self.nodes[node].children.clone().iter().enumerate() {
            if started[i] {
                continue;
            }
            if self.nodes[child].repetition == Repetition::REQUIRED {
                return Err(Error::invalid_operation(format!(
                    "required field '{}' is missing",
                    self.nodes[child].name
                )));
            }
            self.emit_absent(child, def);
        }
        Ok(())
    }

    fn current_field(&self) -> Result<usize> {
        match self.frames.last() {
            Some(Frame::Field { node, .. }) => Ok(*node),
            _ => Err(Error::invalid_operation("value outside of a field")),
        }
    }

    /// Registers one more occurrence of the current field.
    fn next_occurrence(&mut self) -> Result<usize> {
        let node = self.current_field()?;
        let Some(Frame::Field { occurrences, .. }) = self.frames.last_mut() else {
            return Err(Error::invalid_operation("value outside of a field"));
        };
        if *occurrences > 0 && self.nodes[node].repetition != Repetition::REPEATED {
            return Err(Error::invalid_operation(format!(
                "repeated value in non-repeated field '{}'",
                self.nodes[node].name
            )));
        }
        *occurrences += 1;
        Ok(node)
    }

    fn add_value(
        &mut self,
        physical: PhysicalType,
        push: impl FnOnce(&mut LeafValues) -> bool,
    ) -> Result<()> {
        let node = self.current_field()?;
        if self.nodes[node].physical != Some(physical) {
            return Err(Error::invalid_operation(format!(
                "{physical} value for field '{}'",
                self.nodes[node].name
            )));
        }
        self.next_occurrence()?;
        let def = self.nodes[node].def;
        let column = &mut self.columns[self.nodes[node].leaves.start];
        if !push(&mut column.values) {
            return Err(Error::invalid_operation("value buffer type mismatch"));
        }
        column.push_levels(def);
        self.emitted += 1;
        Ok(())
    }
}

impl RecordConsumer for LevelShredder {
    fn start_message(&mut self) -> Result<()> {
        if self.in_message {
            return Err(Error::invalid_operation("start_message within a message"));
        }
        for column in &mut self.columns {
            column.record_start = (column.def_levels.len(), column.values.len());
            column.record_entries = 0;
        }
        self.frames.push(Frame::Group {
            node: 0,
            def: 0,
            started: vec![false; self.nodes[0].children.len()],
        });
        self.in_message = true;
        Ok(())
    }

    fn end_message(&mut self) -> Result<()> {
        match self.frames.pop() {
            Some(Frame::Group {
                node: 0,
                def,
                started,
            }) if self.frames.is_empty() => {
                self.finish_group(0, def, &started)?;
                self.in_message = false;
                self.records += 1;
                Ok(())
            }
            _ => Err(Error::invalid_operation("end_message with open fields")),
        }
    }

    fn start_field(&mut self, name: &str, index: usize) -> Result<()> {
        let Some(Frame::Group { node, def, started }) = self.frames.last_mut() else {
            return Err(Error::invalid_operation("start_field outside of a group"));
        };
        let child = match self.nodes[*node].children.get(index) {
            Some(&child) if self.nodes[child].name == name => child,
            _ => {
                return Err(Error::invalid_arg(
                    "name",
                    format!("no field '{name}' at index {index}"),
                ));
            }
        };
        if std::mem::replace(&mut started[index], true) {
            return Err(Error::invalid_operation(format!("field '{name}' started twice")));
        }
        let parent_def = *def;
        self.frames.push(Frame::Field {
            node: child,
            parent_def,
            mark: self.emitted,
            occurrences: 0,
        });
        Ok(())
    }

    fn end_field(&mut self, name: &str, _index: usize) -> Result<()> {
        match self.frames.pop() {
            Some(Frame::Field {
                node,
                parent_def,
                mark,
                ..
            }) if self.nodes[node].name == name => {
                if self.emitted == mark {
                    self.emit_absent(node, parent_def);
                }
                Ok(())
            }
            _ => Err(Error::invalid_operation(format!("end_field '{name}' does not match"))),
        }
    }

    fn start_group(&mut self) -> Result<()> {
        let node = self.next_occurrence()?;
        if self.nodes[node].physical.is_some() {
            return Err(Error::invalid_operation(format!(
                "group in primitive field '{}'",
                self.nodes[node].name
            )));
        }
        self.frames.push(Frame::Group {
            node,
            def: self.nodes[node].def,
            started: vec![false; self.nodes[node].children.len()],
        });
        Ok(())
    }

    fn end_group(&mut self) -> Result<()> {
        match self.frames.pop() {
            Some(Frame::Group { node, def, started }) if node != 0 => {
                self.finish_group(node, def, &started)
            }
            _ => Err(Error::invalid_operation("end_group without a group")),
        }
    }

    fn add_boolean(&mut self, value: bool) -> Result<()> {
        self.add_value(PhysicalType::BOOLEAN, |values| match values {
            LeafValues::Boolean(v) => {
                v.push(value);
                true
            }
            _ => false,
        })
    }

    fn add_integer(&mut self, value: i32) -> Result<()> {
        self.add_value(PhysicalType::INT32, |values| match values {
            LeafValues::Int32(v) => {
                v.push(value);
                true
            }
            _ => false,
        })
    }

    fn add_long(&mut self, value: i64) -> Result<()> {
        self.add_value(PhysicalType::INT64, |values| match values {
            LeafValues::Int64(v) => {
                v.push(value);
                true
            }
            _ => false,
        })
    }

    fn add_float(&mut self, value: f32) -> Result<()> {
        self.add_value(PhysicalType::FLOAT, |values| match values {
            LeafValues::Float(v) => {
                v.push(value);
                true
            }
            _ => false,
        })
    }

    fn add_double(&mut self, value: f64) -> Result<()> {
        self.add_value(PhysicalType::DOUBLE, |values| match values {
            LeafValues::Double(v) => {
                v.push(value);
                true
            }
            _ => false,
        })
    }

    fn add_binary(&mut self, value: &[u8]) -> Result<()> {
        self.add_value(PhysicalType::BYTE_ARRAY, |values| match values {
            LeafValues::Binary(v) => {
                v.push(ByteArray::from(value.to_vec()));
                true
            }
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use parquet::schema::parser::parse_message_type;

    use super::*;

    const SCHEMA: &str = "message m {
        optional int32 a;
        optional group b (LIST) {
            repeated group list { optional binary element (UTF8); }
        }
        repeated int64 c;
    }";

    fn shredder() -> LevelShredder {
        LevelShredder::new(&parse_message_type(SCHEMA).unwrap()).unwrap()
    }

    fn levels(shredder: &LevelShredder, icol: usize) -> (Vec<i16>, Vec<i16>) {
        let data = shredder.column(icol);
        (data.def_levels.to_vec(), data.rep_levels.to_vec())
    }

    #[test]
    fn test_shred_records() {
        let mut s = shredder();
        assert_eq!(s.column_count(), 3);

        // a = 5, b = ["x", null], c = [1, 2]
        s.start_message().unwrap();
        s.start_field("a", 0).unwrap();
        s.add_integer(5).unwrap();
        s.end_field("a", 0).unwrap();
        s.start_field("b", 1).unwrap();
        s.start_group().unwrap();
        s.start_field("list", 0).unwrap();
        s.start_group().unwrap();
        s.start_field("element", 0).unwrap();
        s.add_binary(b"x").unwrap();
        s.end_field("element", 0).unwrap();
        s.end_group().unwrap();
        s.start_group().unwrap();
        s.end_group().unwrap();
        s.end_field("list", 0).unwrap();
        s.end_group().unwrap();
        s.end_field("b", 1).unwrap();
        s.start_field("c", 2).unwrap();
        s.add_long(1).unwrap();
        s.add_long(2).unwrap();
        s.end_field("c", 2).unwrap();
        s.end_message().unwrap();

        // Everything absent.
        s.start_message().unwrap();
        s.end_message().unwrap();

        // b = []
        s.start_message().unwrap();
        s.start_field("b", 1).unwrap();
        s.start_group().unwrap();
        s.end_group().unwrap();
        s.end_field("b", 1).unwrap();
        s.end_message().unwrap();

        assert_eq!(s.buffered_records(), 3);
        assert_eq!(levels(&s, 0), (vec![1, 0, 0], vec![0, 0, 0]));
        assert_eq!(levels(&s, 1), (vec![3, 2, 0, 1], vec![0, 1, 0, 0]));
        assert_eq!(levels(&s, 2), (vec![1, 1, 0, 0], vec![0, 1, 0, 0]));
        assert_eq!(s.column(1).max_def, 3);
        assert_eq!(s.column(1).max_rep, 1);
        match s.column(2).values {
            LeafValues::Int64(v) => assert_eq!(v, &vec![1, 2]),
            other => panic!("unexpected values {other:?}"),
        }

        s.clear();
        assert_eq!(s.buffered_records(), 0);
        assert!(s.column(1).def_levels.is_empty());
        assert!(s.column(1).values.is_empty());
    }

    #[test]
    fn test_abort_discards_partial_record() {
        let mut s = shredder();
        s.start_message().unwrap();
        s.start_field("c", 2).unwrap();
        s.add_long(7).unwrap();
        s.end_field("c", 2).unwrap();
        s.end_message().unwrap();

        s.start_message().unwrap();
        s.start_field("c", 2).unwrap();
        s.add_long(8).unwrap();
        s.abort_message();

        assert_eq!(levels(&s, 2), (vec![1], vec![0]));
        assert_eq!(s.column(2).values.len(), 1);
        s.start_message().unwrap();
        s.end_message().unwrap();
        assert_eq!(levels(&s, 2), (vec![1, 0], vec![0, 0]));
    }

    #[test]
    fn test_protocol_violations() {
        let schema =
            parse_message_type("message m { required int32 id; optional double x; }").unwrap();
        let mut s = LevelShredder::new(&schema).unwrap();

        s.start_message().unwrap();
        assert!(s.start_field("x", 0).is_err());
        s.start_field("x", 1).unwrap();
        assert!(s.add_integer(1).is_err());
        s.add_double(1.0).unwrap();
        assert!(s.add_double(2.0).is_err());
        s.end_field("x", 1).unwrap();
        // `id` is required.
        assert!(s.end_message().is_err());
        s.abort_message();

        assert!(s.end_group().is_err());
        s.start_message().unwrap();
        s.start_field("id", 0).unwrap();
        assert!(s.start_group().is_err());
        s.abort_message();
        assert!(s.column(0).def_levels.is_empty());
    }
}
