use rusqlite::types::Value;

use crate::error::{AcxError, Result};
use crate::index::INDEX_TABLE;
use crate::models::{CostFlags, SearchField, ALL_SEARCH_FIELDS};

/// How the raw search term is handed to the index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TermSyntax {
    /// Whitespace-separated words, each a prefix match, OR-ed together.
    #[default]
    Simple,
    /// The term is an FTS5 expression (AND/OR/NOT, phrases, NEAR) and is
    /// passed through as written.
    Expression,
}

/// Which text columns a search may match in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldSelection {
    description: bool,
    notes: bool,
    personal_notes: bool,
}

impl FieldSelection {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        ALL_SEARCH_FIELDS.iter().copied().collect()
    }

    pub fn with(mut self, field: SearchField) -> Self {
        self.set(field, true);
        self
    }

    pub fn set(&mut self, field: SearchField, on: bool) {
        match field {
            SearchField::Description => self.description = on,
            SearchField::Notes => self.notes = on,
            SearchField::PersonalNotes => self.personal_notes = on,
        }
    }

    pub fn contains(&self, field: SearchField) -> bool {
        match field {
            SearchField::Description => self.description,
            SearchField::Notes => self.notes,
            SearchField::PersonalNotes => self.personal_notes,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.description || self.notes || self.personal_notes)
    }

    pub fn fields(&self) -> Vec<SearchField> {
        ALL_SEARCH_FIELDS
            .iter()
            .copied()
            .filter(|f| self.contains(*f))
            .collect()
    }
}

impl FromIterator<SearchField> for FieldSelection {
    fn from_iter<I: IntoIterator<Item = SearchField>>(iter: I) -> Self {
        iter.into_iter().fold(Self::none(), Self::with)
    }
}

/// The text side of a composite query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchPredicate {
    /// Nothing can match (no fields selected, or nothing searchable in
    /// the term).
    Nothing,
    /// Every indexed record matches, each with score 0.
    All,
    /// An FTS5 MATCH expression already scoped to the selected columns.
    Expression(String),
}

/// One search: a text predicate AND the cost-category overlap filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeQuery {
    pub predicate: MatchPredicate,
    pub cost_filter: CostFlags,
}

/// Columns every candidate row carries: id, code, description, level, score.
const CANDIDATE_COLUMNS: &str = "c.id, c.account_code, c.description, c.level";

/// Bitmask overlap against parameter `?n`; a zero filter leaves records
/// unconstrained.
fn cost_filter_sql(n: usize) -> String {
    format!("(?{n} = 0 OR (c.flags & ?{n}) != 0)")
}

impl CompositeQuery {
    /// SQL and parameters for this query, or `None` when it cannot match.
    pub fn to_sql(&self) -> Option<(String, Vec<Value>)> {
        let filter = Value::Integer(self.cost_filter.bits() as i64);
        match &self.predicate {
            MatchPredicate::Nothing => None,
            MatchPredicate::All => Some((
                format!(
                    "SELECT {CANDIDATE_COLUMNS}, 0.0 FROM account_codes c \
                     WHERE c.id IN (SELECT id FROM {INDEX_TABLE}_docsize) AND {}",
                    cost_filter_sql(1)
                ),
                vec![filter],
            )),
            MatchPredicate::Expression(expr) => Some((
                format!(
                    "SELECT {CANDIDATE_COLUMNS}, -bm25({INDEX_TABLE}) FROM {INDEX_TABLE} \
                     JOIN account_codes c ON c.id = {INDEX_TABLE}.rowid \
                     WHERE {INDEX_TABLE} MATCH ?1 AND {}",
                    cost_filter_sql(2)
                ),
                vec![Value::Text(expr.clone()), filter],
            )),
        }
    }
}

/// Quote a word as an FTS5 string so its punctuation is never read as
/// query grammar.
fn quote_token(token: &str) -> String {
    format!("\"{}\"", token.replace('"', "\"\""))
}

fn has_searchable_text(token: &str) -> bool {
    token.chars().any(char::is_alphanumeric)
}

/// Reject an expression whose parentheses, outside quoted strings, do not
/// balance. An unbalanced term could close the column-filter group early
/// and match columns that were not selected.
fn check_balanced(expr: &str) -> Result<()> {
    let mut depth: i32 = 0;
    let mut quoted = false;
    for c in expr.chars() {
        match c {
            '"' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => {
                depth -= 1;
                if depth < 0 {
                    return Err(AcxError::QuerySyntax(format!("unmatched ')' in {expr}")));
                }
            }
            _ => {}
        }
    }
    if quoted {
        return Err(AcxError::QuerySyntax(format!("unterminated string in {expr}")));
    }
    if depth > 0 {
        return Err(AcxError::QuerySyntax(format!("unclosed '(' in {expr}")));
    }
    Ok(())
}

/// What the raw term contributes before column scoping.
enum Term {
    /// Empty term: no constraint.
    Unconstrained,
    /// Nothing searchable was left after tokenizing.
    Unsearchable,
    Expression(String),
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    term: String,
    fields: FieldSelection,
    cost_filter: CostFlags,
    syntax: TermSyntax,
}

impl QueryBuilder {
    pub fn new(term: &str) -> Self {
        Self {
            term: term.to_string(),
            ..Default::default()
        }
    }

    pub fn fields(mut self, fields: FieldSelection) -> Self {
        self.fields = fields;
        self
    }

    pub fn cost_filter(mut self, filter: CostFlags) -> Self {
        self.cost_filter = filter;
        self
    }

    pub fn syntax(mut self, syntax: TermSyntax) -> Self {
        self.syntax = syntax;
        self
    }

    fn term(&self) -> Result<Term> {
        let term = self.term.trim();
        if term.is_empty() {
            return Ok(Term::Unconstrained);
        }
        match self.syntax {
            TermSyntax::Expression => {
                check_balanced(term)?;
                Ok(Term::Expression(term.to_string()))
            }
            TermSyntax::Simple => {
                let tokens: Vec<String> = term
                    .split_whitespace()
                    .filter(|t| has_searchable_text(t))
                    .map(|t| format!("{}*", quote_token(t)))
                    .collect();
                if tokens.is_empty() {
                    Ok(Term::Unsearchable)
                } else {
                    Ok(Term::Expression(tokens.join(" OR ")))
                }
            }
        }
    }

    /// Compose the query. An expression-mode term that cannot be kept
    /// inside the column-filter group fails with `QuerySyntax`.
    pub fn build(&self) -> Result<CompositeQuery> {
        let predicate = if self.fields.is_empty() {
            MatchPredicate::Nothing
        } else {
            match self.term()? {
                Term::Unconstrained => MatchPredicate::All,
                Term::Unsearchable => MatchPredicate::Nothing,
                Term::Expression(expr) => {
                    let columns: Vec<&str> =
                        self.fields.fields().iter().map(|f| f.column()).collect();
                    MatchPredicate::Expression(format!("{{{}}} : ({expr})", columns.join(" ")))
                }
            }
        };
        Ok(CompositeQuery {
            predicate,
            cost_filter: self.cost_filter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CostFlag;

    fn desc_and_notes() -> FieldSelection {
        FieldSelection::none()
            .with(SearchField::Description)
            .with(SearchField::Notes)
    }

    #[test]
    fn test_simple_term_is_prefix_or() {
        let q = QueryBuilder::new("grad  pipe").fields(desc_and_notes()).build().unwrap();
        assert_eq!(
            q.predicate,
            MatchPredicate::Expression(
                "{description notes} : (\"grad\"* OR \"pipe\"*)".to_string()
            )
        );
    }

    #[test]
    fn test_simple_term_escapes_grammar() {
        let q = QueryBuilder::new("(6\" pipe")
            .fields(FieldSelection::none().with(SearchField::Description))
            .build()
            .unwrap();
        assert_eq!(
            q.predicate,
            MatchPredicate::Expression(
                "{description} : (\"(6\"\"\"* OR \"pipe\"*)".to_string()
            )
        );
    }

    #[test]
    fn test_expression_passthrough() {
        let q = QueryBuilder::new("grading NOT rock")
            .fields(FieldSelection::all())
            .syntax(TermSyntax::Expression)
            .build()
            .unwrap();
        assert_eq!(
            q.predicate,
            MatchPredicate::Expression(
                "{description notes personal_notes} : (grading NOT rock)".to_string()
            )
        );
    }

    #[test]
    fn test_no_fields_matches_nothing() {
        let q = QueryBuilder::new("grading").fields(FieldSelection::none()).build().unwrap();
        assert_eq!(q.predicate, MatchPredicate::Nothing);
        assert!(q.to_sql().is_none());
        let q = QueryBuilder::new("").fields(FieldSelection::none()).build().unwrap();
        assert_eq!(q.predicate, MatchPredicate::Nothing);
    }

    #[test]
    fn test_empty_term_matches_all() {
        let q = QueryBuilder::new("   ").fields(desc_and_notes()).build().unwrap();
        assert_eq!(q.predicate, MatchPredicate::All);
    }

    #[test]
    fn test_punctuation_only_term_matches_nothing() {
        let q = QueryBuilder::new("- ( )").fields(desc_and_notes()).build().unwrap();
        assert_eq!(q.predicate, MatchPredicate::Nothing);
    }

    #[test]
    fn test_cost_filter_carried() {
        let filter = CostFlag::Labor | CostFlag::Materials;
        let q = QueryBuilder::new("x")
            .fields(desc_and_notes())
            .cost_filter(filter)
            .build()
            .unwrap();
        assert_eq!(q.cost_filter, filter);
        let (_, params) = q.to_sql().unwrap();
        assert_eq!(params[1], Value::Integer(17));
    }

    #[test]
    fn test_field_selection_collect() {
        let sel: FieldSelection = [SearchField::PersonalNotes, SearchField::Description]
            .into_iter()
            .collect();
        assert_eq!(
            sel.fields(),
            vec![SearchField::Description, SearchField::PersonalNotes]
        );
        assert!(!sel.contains(SearchField::Notes));
    }

    #[test]
    fn test_expression_cannot_leave_column_group() {
        for term in ["zzz) OR (foo", "a) OR b", "(grading", "\"open"] {
            let err = QueryBuilder::new(term)
                .fields(FieldSelection::none().with(SearchField::Description))
                .syntax(TermSyntax::Expression)
                .build()
                .unwrap_err();
            assert!(matches!(err, AcxError::QuerySyntax(_)), "{term}");
        }
    }

    #[test]
    fn test_parens_inside_phrases_are_ignored() {
        let q = QueryBuilder::new("\"6) pipe\" OR (rock AND fill)")
            .fields(FieldSelection::none().with(SearchField::Description))
            .syntax(TermSyntax::Expression)
            .build()
            .unwrap();
        assert_eq!(
            q.predicate,
            MatchPredicate::Expression(
                "{description} : (\"6) pipe\" OR (rock AND fill))".to_string()
            )
        );
    }
}
