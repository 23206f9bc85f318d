//! Process queues: the read side of the kanban and list views.
//!
//! Each workflow has a backend queue view. The board queries them all at
//! once, one column per workflow; a column that fails to load keeps its
//! error and the rest of the board still renders.

use chrono::{DateTime, Local, NaiveDate};
use futures_util::future::join_all;
use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::{Ordering, Reverse};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::decision::{DecisionRecord, Priority};
use super::labels::COMPLETED;
use super::timeline::{parse_timeline, TimelineStep};
use super::ProcessKey;
use crate::backend::{Backend, BackendError, Direction, TableQuery};
use crate::config::KanbanConfig;

/// Columns tried in order for a card title
const TITLE_COLUMNS: &[&str] = &["customer_name", "company_name", "title", "contract_number"];

/// One row of a queue view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueItem {
    pub process: ProcessKey,
    pub entity_id: i64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub decision: DecisionRecord,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub timeline: Vec<TimelineStep>,
    /// Every column of the row, for the workspace detail view
    pub row: Map<String, Value>,
}

fn as_i64(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_date(value: Option<&Value>) -> Option<NaiveDate> {
    let s = value?.as_str()?;
    // Timestamps carry the date in their first ten characters
    let date = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

impl QueueItem {
    /// Build an item from a queue row. Rows without an entity id are rejected.
    pub fn from_row(process: ProcessKey, row: Value) -> Option<Self> {
        let Value::Object(row) = row else {
            return None;
        };

        let entity_id = as_i64(row.get(process.id_column()).or_else(|| row.get("id")))?;

        let decision = DecisionRecord::from_row(&row);

        let title = TITLE_COLUMNS
            .iter()
            .filter_map(|c| row.get(*c).and_then(Value::as_str))
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{}", entity_id));

        Some(Self {
            process,
            entity_id,
            title,
            branch_id: as_i64(row.get("branch_id")),
            due_date: as_date(row.get(process.due_column())),
            decision,
            timeline: row.get("timeline").map(parse_timeline).unwrap_or_default(),
            row,
        })
    }

    /// A column of the raw row rendered as text
    pub fn field(&self, column: &str) -> Option<String> {
        match self.row.get(column)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Queue ordering: priority, overdue first, most overdue, earliest due
fn compare_items(a: &QueueItem, b: &QueueItem) -> Ordering {
    let key = |i: &QueueItem| {
        (
            i.decision.priority.rank(),
            !i.decision.is_overdue,
            Reverse(i.decision.overdue_days),
            i.due_date.is_none(),
            i.due_date,
        )
    };
    key(a).cmp(&key(b))
}

/// Stable sort into queue order
pub fn sort_items(items: &mut [QueueItem]) {
    items.sort_by(compare_items);
}

/// Narrowing applied to every queue query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueFilter {
    pub branch_id: Option<i64>,
    /// Empty means every priority
    pub priorities: Vec<Priority>,
    pub min_overdue_days: Option<i64>,
    /// Keep finished workflows in the queue
    pub include_completed: bool,
}

impl QueueFilter {
    pub fn for_branch(branch_id: Option<i64>) -> Self {
        Self {
            branch_id,
            ..Self::default()
        }
    }

    fn apply(&self, mut query: TableQuery) -> TableQuery {
        if !self.include_completed {
            query = query.neq("decision_blocked_by", COMPLETED);
        }
        if let Some(branch) = self.branch_id {
            query = query.eq("branch_id", branch);
        }
        if !self.priorities.is_empty() {
            query = query.is_in(
                "decision_priority",
                self.priorities.iter().map(Priority::as_str),
            );
        }
        if let Some(days) = self.min_overdue_days {
            query = query.gte("overdue_days", days);
        }
        query
    }
}

/// The table query for one workflow's queue
pub fn queue_query(process: ProcessKey, filter: &QueueFilter, page_size: usize) -> TableQuery {
    let query = TableQuery::new()
        .order("decision_priority", Direction::Asc)
        .order("is_overdue", Direction::Desc)
        .order(process.due_column(), Direction::Asc)
        .limit(page_size);
    filter.apply(query)
}

/// One kanban column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KanbanColumn {
    pub process: ProcessKey,
    pub items: Vec<QueueItem>,
    /// Set when this column failed to load
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl KanbanColumn {
    pub fn title(&self) -> String {
        format!("{} ({})", self.process.display_name(), self.items.len())
    }

    pub fn overdue_count(&self) -> usize {
        self.items.iter().filter(|i| i.decision.is_overdue).count()
    }

    pub fn urgent_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.decision.priority == Priority::Urgent)
            .count()
    }
}

/// Every column fetched in one refresh
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KanbanBoard {
    pub columns: Vec<KanbanColumn>,
    pub fetched_at: DateTime<Local>,
}

impl KanbanBoard {
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            fetched_at: Local::now(),
        }
    }

    pub fn column(&self, process: ProcessKey) -> Option<&KanbanColumn> {
        self.columns.iter().find(|c| c.process == process)
    }

    pub fn total_items(&self) -> usize {
        self.columns.iter().map(|c| c.items.len()).sum()
    }

    /// All items in a single queue order, for the list layout
    pub fn as_list(&self) -> Vec<&QueueItem> {
        let mut items: Vec<&QueueItem> = self.columns.iter().flat_map(|c| &c.items).collect();
        items.sort_by(|a, b| compare_items(a, b));
        items
    }

    pub fn errors(&self) -> Vec<(ProcessKey, &str)> {
        self.columns
            .iter()
            .filter_map(|c| c.error.as_deref().map(|e| (c.process, e)))
            .collect()
    }

    pub fn find(&self, process: ProcessKey, entity_id: i64) -> Option<&QueueItem> {
        self.column(process)?
            .items
            .iter()
            .find(|i| i.entity_id == entity_id)
    }
}

/// Header counts for one workflow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessStats {
    pub total: i64,
    pub overdue: i64,
    pub urgent: i64,
}

/// Header counts for every workflow
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub processes: BTreeMap<ProcessKey, ProcessStats>,
}

impl DashboardStats {
    /// Read stats rows: `{process, total, overdue, urgent}`. Unknown processes are skipped.
    pub fn from_rows(rows: &[Value]) -> Self {
        let mut stats = Self::default();
        for row in rows {
            let Some(process) = row
                .get("process")
                .or_else(|| row.get("process_key"))
                .and_then(Value::as_str)
                .and_then(|p| p.parse::<ProcessKey>().ok())
            else {
                debug!(?row, "Skipping stats row without a known process");
                continue;
            };
            let entry = stats.processes.entry(process).or_default();
            entry.total += as_i64(row.get("total").or_else(|| row.get("total_count"))).unwrap_or(0);
            entry.overdue +=
                as_i64(row.get("overdue").or_else(|| row.get("overdue_count"))).unwrap_or(0);
            entry.urgent +=
                as_i64(row.get("urgent").or_else(|| row.get("urgent_count"))).unwrap_or(0);
        }
        stats
    }

    /// Counts derived from a loaded board
    pub fn from_board(board: &KanbanBoard) -> Self {
        let processes = board
            .columns
            .iter()
            .map(|c| {
                (
                    c.process,
                    ProcessStats {
                        total: c.items.len() as i64,
                        overdue: c.overdue_count() as i64,
                        urgent: c.urgent_count() as i64,
                    },
                )
            })
            .collect();
        Self { processes }
    }

    pub fn get(&self, process: ProcessKey) -> ProcessStats {
        self.processes.get(&process).copied().unwrap_or_default()
    }

    pub fn total(&self) -> ProcessStats {
        self.processes
            .values()
            .fold(ProcessStats::default(), |acc, s| ProcessStats {
                total: acc.total + s.total,
                overdue: acc.overdue + s.overdue,
                urgent: acc.urgent + s.urgent,
            })
    }
}

/// Reads queue views from the backend
#[derive(Clone)]
pub struct QueueService {
    backend: Arc<dyn Backend>,
    page_size: usize,
    stats_view: String,
}

impl QueueService {
    pub fn new(backend: Arc<dyn Backend>, config: &KanbanConfig) -> Self {
        Self {
            backend,
            page_size: config.page_size.max(1),
            stats_view: config.stats_view.clone(),
        }
    }

    /// One workflow's queue, sorted
    pub async fn fetch_process(
        &self,
        process: ProcessKey,
        filter: &QueueFilter,
    ) -> Result<Vec<QueueItem>, BackendError> {
        let query = queue_query(process, filter, self.page_size);
        let rows = self
            .backend
            .query_table(&process.queue_view(), &query)
            .await?;

        let row_count = rows.len();
        let mut items: Vec<QueueItem> = rows
            .into_iter()
            .filter_map(|row| QueueItem::from_row(process, row))
            .collect();
        if items.len() < row_count {
            warn!(
                %process,
                skipped = row_count - items.len(),
                "Queue rows without an entity id"
            );
        }
        sort_items(&mut items);
        Ok(items)
    }

    /// Every requested column, fetched concurrently
    pub async fn fetch_board(&self, processes: &[ProcessKey], filter: &QueueFilter) -> KanbanBoard {
        let fetches = processes.iter().map(|process| async move {
            match self.fetch_process(*process, filter).await {
                Ok(items) => KanbanColumn {
                    process: *process,
                    items,
                    error: None,
                },
                Err(e) => {
                    warn!(process = %process, error = %e, "Failed to load queue");
                    KanbanColumn {
                        process: *process,
                        items: Vec::new(),
                        error: Some(e.user_message()),
                    }
                }
            }
        });

        let columns = join_all(fetches).await;
        let board = KanbanBoard {
            columns,
            fetched_at: Local::now(),
        };
        info!(
            items = board.total_items(),
            failed = board.errors().len(),
            "Board refreshed"
        );
        board
    }

    pub async fn fetch_stats(&self, filter: &QueueFilter) -> Result<DashboardStats, BackendError> {
        let mut query = TableQuery::new();
        if let Some(branch) = filter.branch_id {
            query = query.eq("branch_id", branch);
        }
        let rows = self.backend.query_table(&self.stats_view, &query).await?;
        Ok(DashboardStats::from_rows(&rows))
    }

    /// A single row by entity id
    pub async fn fetch_one(
        &self,
        process: ProcessKey,
        entity_id: i64,
    ) -> Result<Option<QueueItem>, BackendError> {
        let query = TableQuery::new()
            .eq(process.id_column(), entity_id)
            .limit(1);
        let rows = self
            .backend
            .query_table(&process.queue_view(), &query)
            .await?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| QueueItem::from_row(process, row)))
    }
}
