use crate::definition::EnumDefinition;
use crate::error::{Result, SyncError};
use crate::numbering::{assign_numbers, canonical_pins, NumberingPolicy};
use crate::parser::literal::escape_string;
use crate::validator::validate_definition;

const REMOVED_MESSAGE: &str = "Removed";
const INDENT: &str = "    ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateOptions {
    pub numbering: NumberingPolicy,
    /// Emit `[UnityEngine.Tooltip]` for members that have one
    pub include_tooltips: bool,
    /// Emit the `<auto-generated>` comment block
    pub include_auto_generated_header: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            numbering: NumberingPolicy::default(),
            include_tooltips: true,
            include_auto_generated_header: true,
        }
    }
}

pub struct EnumGenerator {
    options: GenerateOptions,
}

impl EnumGenerator {
    pub fn new(options: GenerateOptions) -> Self {
        Self { options }
    }

    /// Canonical C# source for `def`. Nothing is produced unless the whole
    /// definition validates; the error lists every offending name.
    pub fn generate(&self, def: &EnumDefinition) -> Result<String> {
        let violations = validate_definition(def);
        if !violations.is_empty() {
            return Err(SyncError::Validation {
                enum_name: def.enum_name().to_string(),
                violations,
            });
        }
        let numbers = assign_numbers(def, self.options.numbering.mode_of(def))
            .ok_or_else(|| SyncError::NumbersExhausted(def.enum_name().to_string()))?;
        Ok(self.render(def, &numbers))
    }

    /// Starter file: `None = 0` followed by three placeholder values.
    pub fn template(&self, enum_name: &str, namespace: &str, use_flags: bool) -> Result<String> {
        let mut def = EnumDefinition::new(enum_name, namespace, use_flags);
        for name in ["None", "Value1", "Value2", "Value3"] {
            def.add_value(name, "").map_err(|violation| SyncError::Validation {
                enum_name: enum_name.to_string(),
                violations: vec![violation],
            })?;
        }
        let mode = self.options.numbering.mode_for(use_flags);
        def.set_value_numbers(canonical_pins(&[Some(0), None, None, None], &[], mode));
        self.generate(&def)
    }

    fn render(&self, def: &EnumDefinition, numbers: &[i64]) -> String {
        let mut lines = Vec::new();

        if self.options.include_auto_generated_header {
            lines.push("// <auto-generated>".to_string());
            lines.push(format!(
                "//     Generated by enum-sync from the '{}' definition.",
                def.enum_name()
            ));
            lines.push("//     Hand edits to this file are merged back into the definition.".to_string());
            lines.push("// </auto-generated>".to_string());
            lines.push(String::new());
        }

        let has_namespace = !def.namespace().is_empty();
        let outer = if has_namespace { INDENT } else { "" };
        let inner = format!("{}{}", outer, INDENT);

        if has_namespace {
            lines.push(format!("namespace {}", def.namespace()));
            lines.push("{".to_string());
        }
        if def.use_flags() {
            lines.push(format!("{}[System.Flags]", outer));
        }
        lines.push(format!("{}public enum {}", outer, def.enum_name()));
        lines.push(format!("{}{{", outer));

        for (i, (name, number)) in def.values().iter().zip(numbers).enumerate() {
            let tooltip = def.tooltips().get(i).map(String::as_str).unwrap_or("");
            if self.options.include_tooltips && !tooltip.is_empty() {
                lines.push(format!(
                    r#"{}[UnityEngine.Tooltip("{}")]"#,
                    inner,
                    escape_string(tooltip)
                ));
            }
            lines.push(format!("{}{} = {},", inner, name, number));
        }

        for (i, name) in def.removed_values().iter().enumerate() {
            let number = def.removed_value_numbers().get(i).copied().unwrap_or(0);
            lines.push(format!(r#"{}[System.Obsolete("{}")]"#, inner, REMOVED_MESSAGE));
            lines.push(format!("{}{} = {},", inner, name, number));
        }

        lines.push(format!("{}}}", outer));
        if has_namespace {
            lines.push("}".to_string());
        }

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

/// Generate with default options.
pub fn generate(def: &EnumDefinition) -> Result<String> {
    EnumGenerator::new(GenerateOptions::default()).generate(def)
}
