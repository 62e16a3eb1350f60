//! Endpoint selection for llama-server's HTTP API.
//!
//! # Design
//! `EndpointKind` is a closed enumeration: each variant knows the selector
//! string callers use to pick it and the wire path the request is POSTed to.
//! Parsing is by exact selector match; anything unrecognized is rejected at
//! the dispatch boundary rather than guessed at.

use std::fmt;

/// One of the eight llama-server endpoints this client can call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    Completion,
    ChatCompletions,
    Embeddings,
    Tokenize,
    Detokenize,
    ApplyTemplate,
    Infill,
    Reranking,
}

impl EndpointKind {
    /// Every endpoint kind, in selector order. Hosts that present a fixed
    /// choice list (dropdowns and the like) build it from this.
    pub const ALL: [EndpointKind; 8] = [
        EndpointKind::Completion,
        EndpointKind::ChatCompletions,
        EndpointKind::Embeddings,
        EndpointKind::Tokenize,
        EndpointKind::Detokenize,
        EndpointKind::ApplyTemplate,
        EndpointKind::Infill,
        EndpointKind::Reranking,
    ];

    /// The selector string callers pass to pick this endpoint.
    pub fn name(self) -> &'static str {
        match self {
            EndpointKind::Completion => "completion",
            EndpointKind::ChatCompletions => "chat_completions",
            EndpointKind::Embeddings => "embeddings",
            EndpointKind::Tokenize => "tokenize",
            EndpointKind::Detokenize => "detokenize",
            EndpointKind::ApplyTemplate => "apply_template",
            EndpointKind::Infill => "infill",
            EndpointKind::Reranking => "reranking",
        }
    }

    /// The URL path the request is POSTed to, relative to the base URL.
    pub fn path(self) -> &'static str {
        match self {
            EndpointKind::Completion => "/completion",
            EndpointKind::ChatCompletions => "/v1/chat/completions",
            EndpointKind::Embeddings => "/v1/embeddings",
            EndpointKind::Tokenize => "/tokenize",
            EndpointKind::Detokenize => "/detokenize",
            EndpointKind::ApplyTemplate => "/apply-template",
            EndpointKind::Infill => "/infill",
            EndpointKind::Reranking => "/v1/rerank",
        }
    }

    /// Parse a selector string. Returns `None` for anything unrecognized.
    pub fn parse(name: &str) -> Option<EndpointKind> {
        match name {
            "completion" => Some(EndpointKind::Completion),
            "chat_completions" => Some(EndpointKind::ChatCompletions),
            "embeddings" => Some(EndpointKind::Embeddings),
            "tokenize" => Some(EndpointKind::Tokenize),
            "detokenize" => Some(EndpointKind::Detokenize),
            "apply_template" => Some(EndpointKind::ApplyTemplate),
            "infill" => Some(EndpointKind::Infill),
            "reranking" => Some(EndpointKind::Reranking),
            _ => None,
        }
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_round_trips_through_its_name() {
        for kind in EndpointKind::ALL {
            assert_eq!(EndpointKind::parse(kind.name()), Some(kind));
        }
    }

    #[test]
    fn unknown_selectors_are_rejected() {
        assert_eq!(EndpointKind::parse("chat"), None);
        assert_eq!(EndpointKind::parse("COMPLETION"), None);
        assert_eq!(EndpointKind::parse(""), None);
        assert_eq!(EndpointKind::parse("rerank"), None);
    }

    #[test]
    fn paths_match_the_server_routes() {
        assert_eq!(EndpointKind::Completion.path(), "/completion");
        assert_eq!(EndpointKind::ChatCompletions.path(), "/v1/chat/completions");
        assert_eq!(EndpointKind::Embeddings.path(), "/v1/embeddings");
        assert_eq!(EndpointKind::Tokenize.path(), "/tokenize");
        assert_eq!(EndpointKind::Detokenize.path(), "/detokenize");
        assert_eq!(EndpointKind::ApplyTemplate.path(), "/apply-template");
        assert_eq!(EndpointKind::Infill.path(), "/infill");
        assert_eq!(EndpointKind::Reranking.path(), "/v1/rerank");
    }

    #[test]
    fn display_uses_the_selector_name() {
        assert_eq!(EndpointKind::ChatCompletions.to_string(), "chat_completions");
    }
}
