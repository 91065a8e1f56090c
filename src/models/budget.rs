use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Hierarchy level of a budget line. N1 is the coarsest grouping, ITEM the billable leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    N1,
    N2,
    N3,
    #[serde(rename = "ITEM")]
    Item,
}

impl Level {
    /// Nesting weight: N1=1 .. ITEM=4. Higher means more nested.
    pub fn weight(self) -> u8 {
        match self {
            Level::N1 => 1,
            Level::N2 => 2,
            Level::N3 => 3,
            Level::Item => 4,
        }
    }

    pub fn is_group(self) -> bool {
        self != Level::Item
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Level::N1 => "N1",
            Level::N2 => "N2",
            Level::N3 => "N3",
            Level::Item => "ITEM",
        }
    }

    pub fn parse(s: &str) -> Option<Level> {
        match s.trim().to_uppercase().as_str() {
            "N1" => Some(Level::N1),
            "N2" => Some(Level::N2),
            "N3" => Some(Level::N3),
            "ITEM" => Some(Level::Item),
            _ => None,
        }
    }
}

/// Per-row classification choice: a level, or drop the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LevelChoice {
    Level(Level),
    Ignore(IgnoreTag),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IgnoreTag {
    #[serde(rename = "IGNORE")]
    Ignore,
}

impl LevelChoice {
    pub fn ignore() -> Self {
        LevelChoice::Ignore(IgnoreTag::Ignore)
    }

    pub fn level(self) -> Option<Level> {
        match self {
            LevelChoice::Level(level) => Some(level),
            LevelChoice::Ignore(_) => None,
        }
    }
}

/// One input line item: source values keyed by header text plus the forced level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowEntry {
    pub values: HashMap<String, String>,
    pub level: Level,
}

impl RowEntry {
    pub fn new(level: Level) -> Self {
        Self {
            values: HashMap::new(),
            level,
        }
    }

    pub fn with(mut self, column: &str, value: &str) -> Self {
        self.values.insert(column.to_string(), value.to_string());
        self
    }

    /// Value under a source column, empty when the column is absent.
    pub fn value(&self, column: &str) -> &str {
        self.values.get(column).map(String::as_str).unwrap_or("")
    }
}

/// Logical fields the template needs from every source row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Item,
    Code,
    Source,
    Description,
    Unit,
    Quantity,
    UnitPrice,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Item,
        Field::Code,
        Field::Source,
        Field::Description,
        Field::Unit,
        Field::Quantity,
        Field::UnitPrice,
    ];

    /// Key used in mapping files and header matching.
    pub fn key(self) -> &'static str {
        match self {
            Field::Item => "ITEM",
            Field::Code => "CODIGO",
            Field::Source => "BANCO",
            Field::Description => "DESCRICAO",
            Field::Unit => "UNID",
            Field::Quantity => "QUANT",
            Field::UnitPrice => "UNIT",
        }
    }
}

/// Logical field -> literal source header text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    #[serde(rename = "ITEM")]
    pub item: String,
    #[serde(rename = "CODIGO")]
    pub code: String,
    #[serde(rename = "BANCO")]
    pub source: String,
    #[serde(rename = "DESCRICAO")]
    pub description: String,
    #[serde(rename = "UNID")]
    pub unit: String,
    #[serde(rename = "QUANT")]
    pub quantity: String,
    #[serde(rename = "UNIT")]
    pub unit_price: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            item: "ITEM".to_string(),
            code: "CÓDIGO".to_string(),
            source: "BANCO".to_string(),
            description: "DESCRIÇÃO".to_string(),
            unit: "UND".to_string(),
            quantity: "QUANT.".to_string(),
            unit_price: "VALOR UNIT".to_string(),
        }
    }
}

impl ColumnMap {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Item => &self.item,
            Field::Code => &self.code,
            Field::Source => &self.source,
            Field::Description => &self.description,
            Field::Unit => &self.unit,
            Field::Quantity => &self.quantity,
            Field::UnitPrice => &self.unit_price,
        }
    }

    pub fn set(&mut self, field: Field, header: impl Into<String>) {
        let header = header.into();
        match field {
            Field::Item => self.item = header,
            Field::Code => self.code = header,
            Field::Source => self.source = header,
            Field::Description => self.description = header,
            Field::Unit => self.unit = header,
            Field::Quantity => self.quantity = header,
            Field::UnitPrice => self.unit_price = header,
        }
    }

    /// Value of a logical field in a row, empty when unmapped.
    pub fn lookup<'a>(&self, row: &'a RowEntry, field: Field) -> &'a str {
        row.value(self.get(field))
    }
}

/// How parsed quantities and unit prices are adjusted before being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrecisionMode {
    /// Cut to two decimals without rounding.
    Trunc,
    /// Round to two decimals.
    Round,
    /// Keep the parsed value untouched.
    #[default]
    Exact,
}

impl PrecisionMode {
    pub fn parse(s: &str) -> Option<PrecisionMode> {
        match s.trim().to_uppercase().as_str() {
            "TRUNC" => Some(PrecisionMode::Trunc),
            "ROUND" => Some(PrecisionMode::Round),
            "EXACT" => Some(PrecisionMode::Exact),
            _ => None,
        }
    }
}

pub const DEFAULT_OUTPUT_NAME: &str = "Orcamento";
pub const DEFAULT_ROW_HEIGHT: f64 = 24.75;

fn default_output_name() -> String {
    DEFAULT_OUTPUT_NAME.to_string()
}

fn default_date() -> String {
    "xx/xx/xxxx".to_string()
}

/// Caller-supplied header fields for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderMetadata {
    #[serde(default = "default_output_name")]
    pub output_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub institution: String,
    #[serde(default)]
    pub sector: String,
    #[serde(default)]
    pub requester: String,
    #[serde(default)]
    pub preparer: String,
    #[serde(default)]
    pub intern: String,
    #[serde(default)]
    pub fiscal_agent: String,
    #[serde(default = "default_date")]
    pub date: String,
    #[serde(default)]
    pub budget_code: String,
    #[serde(default)]
    pub process_number: String,
    /// BDI as a fraction (0.2882 for 28,82%).
    #[serde(default)]
    pub bdi: f64,
    #[serde(default)]
    pub precision: PrecisionMode,
    /// Base table row height; the configured height applies when unset.
    #[serde(default)]
    pub row_height: Option<f64>,
}

impl Default for HeaderMetadata {
    fn default() -> Self {
        Self {
            output_name: default_output_name(),
            title: String::new(),
            institution: String::new(),
            sector: String::new(),
            requester: String::new(),
            preparer: String::new(),
            intern: String::new(),
            fiscal_agent: String::new(),
            date: default_date(),
            budget_code: String::new(),
            process_number: String::new(),
            bdi: 0.0,
            precision: PrecisionMode::default(),
            row_height: None,
        }
    }
}
