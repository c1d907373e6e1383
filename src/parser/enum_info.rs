/// One member declaration read from a C# enum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEnumValue {
    /// Member name (e.g., "Sword")
    pub name: String,
    /// Numeric value, explicit or the one the compiler would assign
    pub numeric_value: i64,
    /// Marked with `[System.Obsolete]`
    pub is_obsolete: bool,
    /// Text of `[UnityEngine.Tooltip("...")]`, empty if absent
    pub tooltip: String,
    /// Whether the declaration carried `= <integer>`
    pub explicit_value: bool,
}

/// A C# enum as read back from source text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedEnum {
    /// Declared enum identifier
    pub enum_name: Option<String>,
    /// Nearest namespace declared before the enum, empty for the global namespace
    pub namespace: String,
    /// Whether `[System.Flags]` precedes the declaration
    pub use_flags: bool,
    /// Members in file order
    pub values: Vec<ParsedEnumValue>,
}

impl ParsedEnum {
    pub fn get(&self, name: &str) -> Option<&ParsedEnumValue> {
        self.values.iter().find(|v| v.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.values.iter().map(|v| v.name.clone()).collect()
    }

    pub fn active(&self) -> impl Iterator<Item = &ParsedEnumValue> {
        self.values.iter().filter(|v| !v.is_obsolete)
    }

    pub fn obsolete(&self) -> impl Iterator<Item = &ParsedEnumValue> {
        self.values.iter().filter(|v| v.is_obsolete)
    }
}

/// One enum declaration located in a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumBlock {
    pub parsed: ParsedEnum,
    /// Byte offset of the body's `{`
    pub open: usize,
    /// Byte offset of the matching `}`
    pub close: usize,
}
