use crate::error::ApiError;

/// Sortable columns. The SQL column name comes from this enum, never from
/// request input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderField {
    Timestamp,
    Value,
    Notes,
    Status,
}

impl OrderField {
    fn column(self) -> &'static str {
        match self {
            OrderField::Timestamp => "timestamp",
            OrderField::Value => "value",
            OrderField::Notes => "notes",
            OrderField::Status => "status",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ordering {
    pub field: OrderField,
    pub direction: Direction,
}

impl Default for Ordering {
    /// Newest first.
    fn default() -> Self {
        Ordering {
            field: OrderField::Timestamp,
            direction: Direction::Desc,
        }
    }
}

impl Ordering {
    /// A field outside the allow-list is rejected, not silently ignored.
    pub fn parse(raw: Option<&str>) -> Result<Self, ApiError> {
        let Some(raw) = raw else {
            return Ok(Ordering::default());
        };
        let (direction, name) = match raw.strip_prefix('-') {
            Some(rest) => (Direction::Desc, rest),
            None => (Direction::Asc, raw),
        };
        let field = match name {
            "timestamp" => OrderField::Timestamp,
            "value" => OrderField::Value,
            "notes" => OrderField::Notes,
            "status" => OrderField::Status,
            _ => {
                return Err(ApiError::field(
                    "ordering",
                    format!("Cannot order by '{name}'."),
                ))
            }
        };
        Ok(Ordering { field, direction })
    }

    /// Tie-break on insertion time keeps the order stable.
    pub fn to_sql(&self) -> String {
        let dir = match self.direction {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        };
        format!("ORDER BY {} {}, created_at ASC", self.field.column(), dir)
    }
}
