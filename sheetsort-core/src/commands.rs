//! Named sort commands and how they map onto ordering changes.
//!
//! Each command targets either the cursor column or the sheet's key columns,
//! sorts ascending or descending, and either replaces the ordering or adds
//! to it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::column::ColumnRef;
use crate::error::{Result, SortError};
use crate::ordering::{OrderingManager, OrderingMode};
use crate::sheet::SheetSource;
use crate::sorting::SortHandle;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortCommand {
    SortAsc,
    SortDesc,
    SortKeysAsc,
    SortKeysDesc,
    SortAscAdd,
    SortDescAdd,
    SortKeysAscAdd,
    SortKeysDescAdd,
}

impl SortCommand {
    pub const ALL: [SortCommand; 8] = [
        SortCommand::SortAsc,
        SortCommand::SortDesc,
        SortCommand::SortKeysAsc,
        SortCommand::SortKeysDesc,
        SortCommand::SortAscAdd,
        SortCommand::SortDescAdd,
        SortCommand::SortKeysAscAdd,
        SortCommand::SortKeysDescAdd,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SortCommand::SortAsc => "sort-asc",
            SortCommand::SortDesc => "sort-desc",
            SortCommand::SortKeysAsc => "sort-keys-asc",
            SortCommand::SortKeysDesc => "sort-keys-desc",
            SortCommand::SortAscAdd => "sort-asc-add",
            SortCommand::SortDescAdd => "sort-desc-add",
            SortCommand::SortKeysAscAdd => "sort-keys-asc-add",
            SortCommand::SortKeysDescAdd => "sort-keys-desc-add",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SortCommand::SortAsc => {
                "sort ascending by current column; replace any existing sort criteria"
            }
            SortCommand::SortDesc => {
                "sort descending by current column; replace any existing sort criteria"
            }
            SortCommand::SortKeysAsc => {
                "sort ascending by all key columns; replace any existing sort criteria"
            }
            SortCommand::SortKeysDesc => {
                "sort descending by all key columns; replace any existing sort criteria"
            }
            SortCommand::SortAscAdd => {
                "sort ascending by current column; add to existing sort criteria"
            }
            SortCommand::SortDescAdd => {
                "sort descending by current column; add to existing sort criteria"
            }
            SortCommand::SortKeysAscAdd => {
                "sort ascending by all key columns; add to existing sort criteria"
            }
            SortCommand::SortKeysDescAdd => {
                "sort descending by all key columns; add to existing sort criteria"
            }
        }
    }

    pub fn descending(self) -> bool {
        matches!(
            self,
            SortCommand::SortDesc
                | SortCommand::SortKeysDesc
                | SortCommand::SortDescAdd
                | SortCommand::SortKeysDescAdd
        )
    }

    pub fn mode(self) -> OrderingMode {
        match self {
            SortCommand::SortAsc
            | SortCommand::SortDesc
            | SortCommand::SortKeysAsc
            | SortCommand::SortKeysDesc => OrderingMode::Replace,
            _ => OrderingMode::Append,
        }
    }

    pub fn targets_key_columns(self) -> bool {
        matches!(
            self,
            SortCommand::SortKeysAsc
                | SortCommand::SortKeysDesc
                | SortCommand::SortKeysAscAdd
                | SortCommand::SortKeysDescAdd
        )
    }
}

impl fmt::Display for SortCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SortCommand {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self> {
        SortCommand::ALL
            .into_iter()
            .find(|command| command.name() == s)
            .ok_or_else(|| SortError::UnknownCommand(s.to_string()))
    }
}

impl<S: SheetSource> OrderingManager<S> {
    /// Run `command` against the cursor column or the sheet's key columns.
    pub async fn apply_command(
        &mut self,
        command: SortCommand,
        cursor: ColumnRef<S::Row>,
        key_columns: &[ColumnRef<S::Row>],
    ) -> Result<Option<SortHandle>> {
        let columns = if command.targets_key_columns() {
            key_columns.to_vec()
        } else {
            vec![cursor]
        };
        self.set_ordering(columns, command.descending(), command.mode())
            .await
    }
}
