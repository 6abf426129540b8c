use crate::cli::open_catalog;
use crate::error::{AcxError, Result};
use crate::fmt::code_line;
use crate::index::SearchIndex;
use crate::models::{CostFlag, CostFlags, SearchField, COST_CATEGORIES};
use crate::query::{FieldSelection, TermSyntax};
use crate::ranker::SortMode;
use crate::search::{SearchOutcome, SearchRequest, Searcher};
use crate::store::Store;

pub struct SearchArgs {
    pub term: String,
    pub fields: Option<Vec<SearchField>>,
    pub all_fields: bool,
    pub cost: Vec<CostFlag>,
    pub sort: Option<SortMode>,
    pub raw: bool,
    pub limit: Option<usize>,
    pub scores: bool,
    pub color: bool,
}

pub fn run(args: SearchArgs) -> Result<()> {
    if let Some(flag) = args.cost.iter().find(|f| !COST_CATEGORIES.contains(*f)) {
        return Err(AcxError::Other(format!(
            "{} is a unit conversion toggle, not a cost category",
            flag.key()
        )));
    }
    let (settings, conn) = open_catalog()?;

    let fields: FieldSelection = if args.all_fields {
        FieldSelection::all()
    } else {
        args.fields
            .unwrap_or_else(|| settings.search_fields.clone())
            .into_iter()
            .collect()
    };
    let request = SearchRequest {
        term: args.term,
        fields,
        cost_filter: args.cost.into_iter().collect::<CostFlags>(),
        sort: args.sort.unwrap_or(settings.sort_mode),
        syntax: if args.raw {
            TermSyntax::Expression
        } else {
            TermSyntax::Simple
        },
    };

    let searcher = Searcher::new(Store::new(&conn), SearchIndex::new(&conn));
    let outcome = searcher.run(&request)?;
    if let SearchOutcome::Failed(message) = &outcome {
        eprintln!("{message}");
        return Ok(());
    }
    let hits = outcome.hits();

    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    let color = args.color || settings.color_hierarchy;
    let shown = args.limit.unwrap_or(hits.len()).min(hits.len());
    for hit in hits.iter().take(shown) {
        let line = code_line(&hit.account_code, &hit.description, hit.level, color);
        if args.scores {
            println!("{:>8.3}  {line}", hit.score);
        } else {
            println!("{line}");
        }
    }
    if shown < hits.len() {
        println!("... {} more", hits.len() - shown);
    }
    Ok(())
}
