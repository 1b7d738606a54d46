use std::sync::Arc;

use crate::table::Table;

/// One retained table value and the stage that produced it.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Stage name
    pub stage: String,
    /// Table after the stage
    pub table: Arc<Table>,
}

/// Linear snapshot history with undo and redo.
///
/// Stages never mutate a table, so undo is just moving the cursor back to an
/// earlier value. Applying a stage after an undo discards the redo branch.
///
/// ```rust
/// use metannot::pipeline::Session;
/// use metannot::table::{Row, Table};
/// use metannot::error::CoreError;
///
/// let mut session = Session::new(Table::from_rows(vec![Row::new().with("ID", "1")]));
/// session
///     .apply("drop all", |t| Ok::<_, CoreError>(t.filter_rows(|_| false)))
///     .unwrap();
/// assert!(session.current().is_empty());
/// assert!(session.undo());
/// assert_eq!(session.current().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Session {
    snapshots: Vec<Snapshot>,
    cursor: usize,
}

impl Session {
    /// Start a session from an imported table.
    pub fn new(initial: Table) -> Self {
        Self::with_stage("import", initial)
    }

    /// Start a session whose first snapshot has a custom stage name.
    pub fn with_stage(stage: impl Into<String>, initial: Table) -> Self {
        Self {
            snapshots: vec![Snapshot {
                stage: stage.into(),
                table: Arc::new(initial),
            }],
            cursor: 0,
        }
    }

    /// Table at the cursor.
    pub fn current(&self) -> &Table {
        &self.snapshots[self.cursor].table
    }

    /// Shared handle to the table at the cursor.
    pub fn current_shared(&self) -> Arc<Table> {
        Arc::clone(&self.snapshots[self.cursor].table)
    }

    /// Stage that produced the current table.
    pub fn stage(&self) -> &str {
        &self.snapshots[self.cursor].stage
    }

    /// Run `transform` on the current table and record the result.
    ///
    /// On error nothing is recorded and the current table stays put.
    pub fn apply<F, E>(&mut self, stage: impl Into<String>, transform: F) -> Result<&Table, E>
    where
        F: FnOnce(&Table) -> Result<Table, E>,
    {
        let next = transform(self.current())?;
        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push(Snapshot {
            stage: stage.into(),
            table: Arc::new(next),
        });
        self.cursor += 1;
        Ok(self.current())
    }

    /// Step back one snapshot. Returns false at the start of the history.
    pub fn undo(&mut self) -> bool {
        if self.can_undo() {
            self.cursor -= 1;
            true
        } else {
            false
        }
    }

    /// Step forward again after an undo.
    pub fn redo(&mut self) -> bool {
        if self.can_redo() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Whether an earlier snapshot exists.
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Whether an undone snapshot can be restored.
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    /// All retained snapshots, oldest first, including any redo branch.
    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// Consume the session and return the current table.
    pub fn into_current(self) -> Arc<Table> {
        let Self { mut snapshots, cursor } = self;
        snapshots.swap_remove(cursor).table
    }
}
