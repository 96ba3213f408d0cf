use pqtable_common::Result;

/// Receiver of the event stream describing one record at a time.
///
/// A record is framed by `start_message`/`end_message`. Inside it, every field
/// that holds data is framed by `start_field`/`end_field`; fields that are not
/// started are absent. Group-typed fields wrap each of their occurrences in
/// `start_group`/`end_group`, primitive fields receive one `add_*` call per
/// occurrence.
pub trait RecordConsumer {
    fn start_message(&mut self) -> Result<()>;

    fn end_message(&mut self) -> Result<()>;

    /// Starts the field `name`, the `index`-th child of the enclosing group.
    fn start_field(&mut self, name: &str, index: usize) -> Result<()>;

    fn end_field(&mut self, name: &str, index: usize) -> Result<()>;

    fn start_group(&mut self) -> Result<()>;

    fn end_group(&mut self) -> Result<()>;

    fn add_boolean(&mut self, value: bool) -> Result<()>;

    fn add_integer(&mut self, value: i32) -> Result<()>;

    fn add_long(&mut self, value: i64) -> Result<()>;

    fn add_float(&mut self, value: f32) -> Result<()>;

    fn add_double(&mut self, value: f64) -> Result<()>;

    fn add_binary(&mut self, value: &[u8]) -> Result<()>;
}
