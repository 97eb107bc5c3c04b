//! Mapping from correction actions to tool invocations.

use serde_json::{json, Value};

use rag_types::{CorrectionActionType, CorrectionStrategy, ToolParams, VECTOR_SEARCH, WEB_SEARCH};

/// What a correction knows about the query it is repairing.
#[derive(Debug, Clone)]
pub struct CorrectionContext<'a> {
    /// The user query, without injected conversation context
    pub query: &'a str,
    /// Keywords from the plan's intent analysis
    pub keywords: &'a [String],
    /// `top_k` used for ordinary retrieval
    pub top_k: usize,
}

/// Tool and parameter builder for one correction action.
#[derive(Clone, Copy)]
pub struct CorrectionRoute {
    pub tool_name: &'static str,
    build: fn(&CorrectionContext<'_>, &CorrectionStrategy) -> ToolParams,
}

impl CorrectionRoute {
    /// Route for `action`.
    pub fn for_action(action: CorrectionActionType) -> Self {
        match action {
            CorrectionActionType::ExpandSearch => Self {
                tool_name: VECTOR_SEARCH,
                build: expand_search,
            },
            CorrectionActionType::VerifySources => Self {
                tool_name: VECTOR_SEARCH,
                build: verify_sources,
            },
            CorrectionActionType::FillGap => Self {
                tool_name: VECTOR_SEARCH,
                build: fill_gap,
            },
            CorrectionActionType::RefineQuery => Self {
                tool_name: VECTOR_SEARCH,
                build: refine_query,
            },
            CorrectionActionType::UpdateSearch => Self {
                tool_name: WEB_SEARCH,
                build: update_search,
            },
        }
    }

    /// Parameters for the tool call that carries out `strategy`.
    pub fn params(&self, context: &CorrectionContext<'_>, strategy: &CorrectionStrategy) -> ToolParams {
        (self.build)(context, strategy)
    }
}

fn expand_search(context: &CorrectionContext<'_>, _: &CorrectionStrategy) -> ToolParams {
    vector(
        format!("{} overview details", context.query),
        context.top_k.saturating_mul(2),
    )
}

fn verify_sources(context: &CorrectionContext<'_>, _: &CorrectionStrategy) -> ToolParams {
    vector(format!("{} evidence sources", context.query), context.top_k)
}

fn fill_gap(context: &CorrectionContext<'_>, strategy: &CorrectionStrategy) -> ToolParams {
    let query = match strategy.query_hint.as_deref() {
        Some(hint) => format!("{} {}", context.query, hint),
        None => context.query.to_string(),
    };
    vector(query, context.top_k)
}

fn refine_query(context: &CorrectionContext<'_>, strategy: &CorrectionStrategy) -> ToolParams {
    let query = match strategy.query_hint.as_deref() {
        Some(hint) => hint.to_string(),
        None if !context.keywords.is_empty() => context.keywords.join(" "),
        None => context.query.to_string(),
    };
    vector(query, context.top_k)
}

fn update_search(context: &CorrectionContext<'_>, _: &CorrectionStrategy) -> ToolParams {
    object(json!({"query": format!("{} latest", context.query)}))
}

fn vector(query: String, top_k: usize) -> ToolParams {
    object(json!({"query": query, "top_k": top_k.max(1)}))
}

fn object(value: Value) -> ToolParams {
    match value {
        Value::Object(map) => map,
        _ => ToolParams::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_types::QualityDimension;

    fn context<'a>(keywords: &'a [String]) -> CorrectionContext<'a> {
        CorrectionContext {
            query: "What is machine learning?",
            keywords,
            top_k: 5,
        }
    }

    fn strategy(action: CorrectionActionType) -> CorrectionStrategy {
        CorrectionStrategy::new(QualityDimension::Completeness, action, "test")
    }

    #[test]
    fn test_routes() {
        let keywords = vec!["machine".to_string(), "learning".to_string()];
        let ctx = context(&keywords);

        let route = CorrectionRoute::for_action(CorrectionActionType::ExpandSearch);
        let params = route.params(&ctx, &strategy(CorrectionActionType::ExpandSearch));
        assert_eq!(route.tool_name, VECTOR_SEARCH);
        assert_eq!(params["query"], "What is machine learning? overview details");
        assert_eq!(params["top_k"], 10);

        let route = CorrectionRoute::for_action(CorrectionActionType::VerifySources);
        let params = route.params(&ctx, &strategy(CorrectionActionType::VerifySources));
        assert_eq!(params["query"], "What is machine learning? evidence sources");

        let route = CorrectionRoute::for_action(CorrectionActionType::UpdateSearch);
        let params = route.params(&ctx, &strategy(CorrectionActionType::UpdateSearch));
        assert_eq!(route.tool_name, WEB_SEARCH);
        assert_eq!(params["query"], "What is machine learning? latest");
    }

    #[test]
    fn test_hints() {
        let keywords = vec!["machine".to_string(), "learning".to_string()];
        let ctx = context(&keywords);

        let fill = strategy(CorrectionActionType::FillGap).with_query_hint("Austin");
        let params = CorrectionRoute::for_action(CorrectionActionType::FillGap).params(&ctx, &fill);
        assert_eq!(params["query"], "What is machine learning? Austin");

        let refine = strategy(CorrectionActionType::RefineQuery);
        let route = CorrectionRoute::for_action(CorrectionActionType::RefineQuery);
        assert_eq!(route.params(&ctx, &refine)["query"], "machine learning");
        assert_eq!(route.params(&context(&[]), &refine)["query"], "What is machine learning?");
    }
}
