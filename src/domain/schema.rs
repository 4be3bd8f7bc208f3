// debugger-proto-gen is open-source under the Apache License 2.0; see LICENSE for usage and contributions.
// FunctionTable numbers the Function enum and render_schema lays out the DebuggerMessage document.

use std::collections::HashMap;
use std::fmt::Write as _;

use thiserror::Error;

use super::entry::{extract_entries, ParseError};
use FieldLabel::{Optional, Required};

/// Kept byte-identical to the header of the schema already checked in next
/// to the generated bindings.
pub const SCHEMA_HEADER: &str =
    "// do not edit; auto generated by generate_DebuggerMessage_proto.py";
pub const SCHEMA_PACKAGE: &str = "GLESv2Debugger";

/// Flow-control values appended after every GL function, in wire order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    Ack,
    Neg,
    Continue,
    Skip,
}

impl Control {
    pub const ALL: [Control; 4] = [Self::Ack, Self::Neg, Self::Continue, Self::Skip];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ack => "ACK",
            Self::Neg => "NEG",
            Self::Continue => "CONTINUE",
            Self::Skip => "SKIP",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldLabel {
    Required,
    Optional,
}

impl FieldLabel {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Optional => "optional",
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FieldSpec {
    pub label: FieldLabel,
    pub ty: &'static str,
    pub name: &'static str,
    pub number: u32,
    pub default: Option<&'static str>,
    pub comment: Option<&'static str>,
}

const fn field(label: FieldLabel, ty: &'static str, name: &'static str, number: u32) -> FieldSpec {
    FieldSpec {
        label,
        ty,
        name,
        number,
        default: None,
        comment: None,
    }
}

const fn commented(spec: FieldSpec, comment: &'static str) -> FieldSpec {
    FieldSpec {
        comment: Some(comment),
        ..spec
    }
}

/// `context_id` precedes the enum block; the rest follow it.
pub const CONTEXT_FIELD: FieldSpec =
    commented(field(Required, "int32", "context_id", 1), "GL context id");

/// Fields after the Function enum, in document order. Numbers 12 to 15 are
/// unassigned and the numbering is part of the deployed wire contract.
pub const MESSAGE_FIELDS: [FieldSpec; 15] = [
    FieldSpec {
        default: Some("NEG"),
        ..commented(field(Required, "Function", "function", 2), "type/function of message")
    },
    field(Required, "bool", "has_next_message", 3),
    field(Required, "bool", "expect_response", 4),
    commented(field(Optional, "int32", "ret", 5), "return value from previous GL call"),
    commented(field(Optional, "int32", "arg0", 6), "args to GL call"),
    field(Optional, "int32", "arg1", 7),
    field(Optional, "int32", "arg2", 8),
    field(Optional, "int32", "arg3", 9),
    field(Optional, "int32", "arg4", 16),
    field(Optional, "int32", "arg5", 17),
    field(Optional, "int32", "arg6", 18),
    field(Optional, "int32", "arg7", 19),
    field(Optional, "int32", "arg8", 20),
    commented(field(Optional, "bytes", "data", 10), "variable length data used for GL call"),
    commented(field(Optional, "float", "time", 11), "timing of previous GL call (seconds)"),
];

#[derive(Debug, Error)]
pub enum TableError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("`{name}` at {at} duplicates the enum member at {first}")]
    Duplicate {
        name: String,
        at: String,
        first: String,
    },
    #[error("`{name}` at {at} collides with a control value")]
    ReservedName { name: String, at: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnumLine {
    Member { name: String, value: u32 },
    Comment(String),
}

/// Accumulates the Function enum body one input pass at a time.
#[derive(Debug, Default)]
pub struct FunctionTable {
    lines: Vec<EnumLine>,
    seen: HashMap<String, String>,
    next_index: u32,
    functions: usize,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends every entry found in `lines`, then the `end_marker` comment.
    /// Returns the number of entries the pass contributed.
    ///
    /// A failing pass leaves the table exactly as it was. `origin` only
    /// labels duplicate reports, e.g. the input file name.
    pub fn extend_pass<I>(
        &mut self,
        origin: &str,
        lines: I,
        end_marker: &str,
    ) -> Result<usize, TableError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut entries = extract_entries(lines, self.next_index);
        let mut pending: Vec<EnumLine> = Vec::new();
        let mut pending_seen: HashMap<String, String> = HashMap::new();
        for entry in entries.by_ref() {
            let entry = entry?;
            let at = format!("{}:{}", origin, entry.line);
            if Control::ALL.iter().any(|control| control.as_str() == entry.name) {
                return Err(TableError::ReservedName {
                    name: entry.name,
                    at,
                });
            }
            if let Some(first) = self
                .seen
                .get(&entry.name)
                .or_else(|| pending_seen.get(&entry.name))
            {
                return Err(TableError::Duplicate {
                    name: entry.name,
                    at,
                    first: first.clone(),
                });
            }
            pending_seen.insert(entry.name.clone(), at);
            pending.push(EnumLine::Member {
                name: entry.name,
                value: entry.index,
            });
        }

        let added = pending.len();
        self.seen.extend(pending_seen);
        self.lines.extend(pending);
        self.lines.push(EnumLine::Comment(end_marker.to_string()));
        self.next_index = entries.next_index();
        self.functions += added;
        Ok(added)
    }

    pub fn next_index(&self) -> u32 {
        self.next_index
    }

    /// Closes the table with the control values at the next four indices.
    pub fn finish(mut self) -> FunctionEnum {
        let control_start = self.next_index;
        for control in Control::ALL {
            self.lines.push(EnumLine::Member {
                name: control.as_str().to_string(),
                value: self.next_index,
            });
            self.next_index += 1;
        }

        FunctionEnum {
            lines: self.lines,
            functions: self.functions,
            control_start,
        }
    }
}

/// Complete Function enum body, ready to render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionEnum {
    lines: Vec<EnumLine>,
    functions: usize,
    control_start: u32,
}

impl FunctionEnum {
    pub fn lines(&self) -> &[EnumLine] {
        &self.lines
    }

    /// Members in value order, controls included.
    pub fn members(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.lines.iter().filter_map(|line| match line {
            EnumLine::Member { name, value } => Some((name.as_str(), *value)),
            EnumLine::Comment(_) => None,
        })
    }

    pub fn function_count(&self) -> usize {
        self.functions
    }

    /// Value assigned to `ACK`.
    pub fn control_start(&self) -> u32 {
        self.control_start
    }
}

/// Renders the full schema document. Same enum, same bytes.
pub fn render_schema(functions: &FunctionEnum) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_schema(&mut out, functions);
    out
}

fn write_schema(out: &mut String, functions: &FunctionEnum) -> std::fmt::Result {
    writeln!(out, "{}", SCHEMA_HEADER)?;
    writeln!(out, "package {};", SCHEMA_PACKAGE)?;
    writeln!(out)?;
    writeln!(out, "option optimize_for = LITE_RUNTIME;")?;
    writeln!(out)?;
    writeln!(out, "message Message")?;
    writeln!(out, "{{")?;
    write_field(out, &CONTEXT_FIELD)?;
    writeln!(out, "\tenum Function")?;
    writeln!(out, "\t{{")?;
    for line in functions.lines() {
        match line {
            EnumLine::Member { name, value } => writeln!(out, "\t\t{} = {};", name, value)?,
            EnumLine::Comment(text) => writeln!(out, "\t\t// {}", text)?,
        }
    }
    writeln!(out, "\t}}")?;
    for spec in &MESSAGE_FIELDS {
        write_field(out, spec)?;
    }
    writeln!(out, "}}")
}

fn write_field(out: &mut String, spec: &FieldSpec) -> std::fmt::Result {
    write!(
        out,
        "\t{} {} {} = {}",
        spec.label.as_str(),
        spec.ty,
        spec.name,
        spec.number
    )?;
    if let Some(default) = spec.default {
        write!(out, " [default = {}]", default)?;
    }
    write!(out, ";")?;
    if let Some(comment) = spec.comment {
        write!(out, " // {}", comment)?;
    }
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    const GL_END: &str = "end of GL functions";

    fn build(lines: &[&str]) -> FunctionEnum {
        let mut table = FunctionTable::new();
        table.extend_pass("gl2_api.in", lines, GL_END).expect("pass succeeds");
        table.finish()
    }

    fn declarations(functions: &FunctionEnum) -> String {
        functions
            .members()
            .map(|(name, value)| format!("{} = {};", name, value))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn numbers_functions_then_controls() {
        let functions = build(&["API_ENTRY(glClear)", "// comment", "API_ENTRY(glDrawArrays)"]);
        assert_eq!(
            declarations(&functions),
            "glClear = 0; glDrawArrays = 1; ACK = 2; NEG = 3; CONTINUE = 4; SKIP = 5;"
        );
        assert_eq!(functions.function_count(), 2);
        assert_eq!(functions.control_start(), 2);
    }

    #[test]
    fn empty_input_only_has_controls() {
        let functions = build(&[]);
        assert_eq!(
            declarations(&functions),
            "ACK = 0; NEG = 1; CONTINUE = 2; SKIP = 3;"
        );
    }

    #[test]
    fn n_entries_give_n_plus_four_members() {
        let lines: Vec<String> = (0..40).map(|i| format!("void API_ENTRY(glFn{})(void) {{", i)).collect();
        let mut table = FunctionTable::new();
        table.extend_pass("gl2_api.in", &lines, GL_END).unwrap();
        let functions = table.finish();

        let members: Vec<_> = functions.members().collect();
        assert_eq!(members.len(), 44);
        for (i, (name, value)) in members.iter().take(40).enumerate() {
            assert_eq!(*name, format!("glFn{}", i));
            assert_eq!(*value as usize, i);
        }
        let controls: Vec<_> = members[40..].iter().map(|(name, value)| (*name, *value)).collect();
        assert_eq!(
            controls,
            vec![("ACK", 40), ("NEG", 41), ("CONTINUE", 42), ("SKIP", 43)]
        );
    }

    #[test]
    fn second_pass_continues_numbering_with_its_own_marker() {
        let mut table = FunctionTable::new();
        table.extend_pass("gl2_api.in", ["API_ENTRY(glA)"], GL_END).unwrap();
        let added = table
            .extend_pass("gl2ext_api.in", ["API_ENTRY(glB)", "API_ENTRY(glC)"], "end of GL EXT functions")
            .unwrap();
        assert_eq!(added, 2);
        assert_eq!(table.next_index(), 3);

        let functions = table.finish();
        assert_eq!(
            functions.lines()[1],
            EnumLine::Comment(GL_END.to_string())
        );
        assert_eq!(
            functions.lines()[4],
            EnumLine::Comment("end of GL EXT functions".to_string())
        );
        assert_eq!(functions.control_start(), 3);
    }

    #[test]
    fn duplicate_names_are_rejected_across_passes() {
        let mut table = FunctionTable::new();
        table.extend_pass("gl2_api.in", ["API_ENTRY(glA)"], GL_END).unwrap();
        let err = table
            .extend_pass("gl2ext_api.in", ["", "API_ENTRY(glA)"], "end of GL EXT functions")
            .unwrap_err();
        match err {
            TableError::Duplicate { name, at, first } => {
                assert_eq!(name, "glA");
                assert_eq!(at, "gl2ext_api.in:2");
                assert_eq!(first, "gl2_api.in:1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn failed_pass_leaves_table_untouched() {
        let mut table = FunctionTable::new();
        table.extend_pass("gl2_api.in", ["API_ENTRY(glA)"], GL_END).unwrap();
        assert!(table
            .extend_pass("gl2ext_api.in", ["API_ENTRY(glB)", "API_ENTRY(glC"], "end of GL EXT functions")
            .is_err());
        assert_eq!(table.next_index(), 1);

        // glB was never committed, so a retry may use it.
        table
            .extend_pass("gl2ext_api.in", ["API_ENTRY(glB)"], "end of GL EXT functions")
            .expect("retry succeeds");

        let functions = table.finish();
        let values: Vec<u32> = functions.members().map(|(_, value)| value).collect();
        assert_eq!(values, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(functions.function_count(), 2);
    }

    #[test]
    fn failed_first_pass_keeps_controls_unique() {
        let mut table = FunctionTable::new();
        assert!(table
            .extend_pass("gl2_api.in", ["API_ENTRY(glA)", "API_ENTRY(glB"], GL_END)
            .is_err());

        let functions = table.finish();
        let members: Vec<_> = functions.members().collect();
        assert_eq!(
            members,
            vec![("ACK", 0), ("NEG", 1), ("CONTINUE", 2), ("SKIP", 3)]
        );
        assert!(functions.lines().iter().all(|line| matches!(line, EnumLine::Member { .. })));
    }

    #[test]
    fn duplicate_within_one_pass_is_rejected() {
        let mut table = FunctionTable::new();
        let err = table
            .extend_pass("gl2_api.in", ["API_ENTRY(glA)", "API_ENTRY(glA)"], GL_END)
            .unwrap_err();
        assert!(matches!(err, TableError::Duplicate { ref first, .. } if first == "gl2_api.in:1"));
        assert_eq!(table.next_index(), 0);
    }

    #[test]
    fn input_named_like_a_control_is_rejected() {
        let mut table = FunctionTable::new();
        let err = table
            .extend_pass("gl2_api.in", ["API_ENTRY(glA)", "API_ENTRY(ACK)"], GL_END)
            .unwrap_err();
        assert!(matches!(err, TableError::ReservedName { ref at, .. } if at == "gl2_api.in:2"));
    }

    #[test]
    fn field_numbers_are_unique_and_keep_the_gap() {
        let numbers: Vec<u32> = std::iter::once(CONTEXT_FIELD.number)
            .chain(MESSAGE_FIELDS.iter().map(|spec| spec.number))
            .collect();
        let unique: HashSet<_> = numbers.iter().copied().collect();
        assert_eq!(unique.len(), numbers.len());
        for number in [6, 7, 8, 9, 16, 17, 18, 19, 20] {
            assert!(unique.contains(&number), "missing field {number}");
        }
        for number in 12..=15 {
            assert!(!unique.contains(&number), "field {number} must stay unassigned");
        }
    }

    #[test]
    fn renders_complete_document() {
        let functions = build(&["API_ENTRY(glClear)"]);
        let expected = "\
// do not edit; auto generated by generate_DebuggerMessage_proto.py
package GLESv2Debugger;

option optimize_for = LITE_RUNTIME;

message Message
{
\trequired int32 context_id = 1; // GL context id
\tenum Function
\t{
\t\tglClear = 0;
\t\t// end of GL functions
\t\tACK = 1;
\t\tNEG = 2;
\t\tCONTINUE = 3;
\t\tSKIP = 4;
\t}
\trequired Function function = 2 [default = NEG]; // type/function of message
\trequired bool has_next_message = 3;
\trequired bool expect_response = 4;
\toptional int32 ret = 5; // return value from previous GL call
\toptional int32 arg0 = 6; // args to GL call
\toptional int32 arg1 = 7;
\toptional int32 arg2 = 8;
\toptional int32 arg3 = 9;
\toptional int32 arg4 = 16;
\toptional int32 arg5 = 17;
\toptional int32 arg6 = 18;
\toptional int32 arg7 = 19;
\toptional int32 arg8 = 20;
\toptional bytes data = 10; // variable length data used for GL call
\toptional float time = 11; // timing of previous GL call (seconds)
}
";
        assert_eq!(render_schema(&functions), expected);
    }

    #[test]
    fn rendering_is_deterministic() {
        let lines = ["API_ENTRY(glA)", "API_ENTRY(glB)"];
        assert_eq!(render_schema(&build(&lines)), render_schema(&build(&lines)));
    }
}
