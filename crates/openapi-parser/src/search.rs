//! Keyword search over endpoints

use crate::types::Endpoint;

/// A scored search hit
#[derive(Debug, Clone)]
pub struct EndpointMatch<'a> {
    pub endpoint: &'a Endpoint,
    pub score: u32,
}

/// Tokenized keyword query.
///
/// Each term scores independently against the endpoint's path, operation id,
/// summary, tags, description and method; an endpoint matches when at least
/// one term hits.
#[derive(Debug, Clone)]
pub struct EndpointSearch {
    terms: Vec<String>,
}

impl EndpointSearch {
    pub fn new(query: &str) -> Self {
        let terms = query
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect();

        Self { terms }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Relevance of `endpoint` for this query, 0 when nothing matches
    pub fn score(&self, endpoint: &Endpoint) -> u32 {
        let path = endpoint.path.to_lowercase();
        let operation_id = endpoint
            .operation_id
            .as_deref()
            .unwrap_or_default()
            .to_lowercase();
        let summary = endpoint
            .summary
            .as_deref()
            .unwrap_or_default()
            .to_lowercase();
        let description = endpoint
            .description
            .as_deref()
            .unwrap_or_default()
            .to_lowercase();
        let tags: Vec<String> = endpoint.tags.iter().map(|t| t.to_lowercase()).collect();
        let method = endpoint.method.as_str().to_lowercase();

        self.terms
            .iter()
            .map(|term| {
                let mut score = 0;
                if path.contains(term.as_str()) {
                    score += 3;
                }
                if operation_id.contains(term.as_str()) {
                    score += 3;
                }
                if summary.contains(term.as_str()) {
                    score += 2;
                }
                if tags.iter().any(|t| t.contains(term.as_str())) {
                    score += 2;
                }
                if description.contains(term.as_str()) {
                    score += 1;
                }
                if method == *term {
                    score += 1;
                }
                score
            })
            .sum()
    }

    /// Best `limit` matches, highest score first (ties keep input order)
    pub fn rank<'a, I>(&self, endpoints: I, limit: usize) -> Vec<EndpointMatch<'a>>
    where
        I: IntoIterator<Item = &'a Endpoint>,
    {
        let mut matches: Vec<EndpointMatch<'a>> = endpoints
            .into_iter()
            .map(|endpoint| EndpointMatch {
                endpoint,
                score: self.score(endpoint),
            })
            .filter(|m| m.score > 0)
            .collect();

        matches.sort_by(|a, b| b.score.cmp(&a.score));
        matches.truncate(limit);
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HttpMethod;

    fn endpoint(method: HttpMethod, path: &str, operation_id: &str, summary: &str) -> Endpoint {
        Endpoint {
            method,
            path: path.to_string(),
            operation_id: Some(operation_id.to_string()),
            summary: Some(summary.to_string()),
            description: None,
            tags: vec![],
            deprecated: false,
            parameters: vec![],
            request_body: None,
        }
    }

    fn endpoints() -> Vec<Endpoint> {
        vec![
            endpoint(HttpMethod::Get, "/v1/customers", "listCustomers", "List customers"),
            endpoint(HttpMethod::Post, "/v1/customers", "createCustomer", "Create a customer"),
            endpoint(HttpMethod::Get, "/v1/invoices/{id}", "getInvoice", "Retrieve an invoice"),
        ]
    }

    #[test]
    fn test_tokenize_query() {
        let search = EndpointSearch::new("Create-customer, now!");
        assert_eq!(search.terms, vec!["create", "customer", "now"]);
        assert!(EndpointSearch::new("  ,, ").is_empty());
    }

    #[test]
    fn test_rank_orders_by_score() {
        let eps = endpoints();
        let search = EndpointSearch::new("create customer");

        let matches = search.rank(&eps, 10);
        assert_eq!(matches.len(), 2);
        assert_eq!(
            matches[0].endpoint.operation_id.as_deref(),
            Some("createCustomer")
        );
        assert!(matches[0].score > matches[1].score);
    }

    #[test]
    fn test_rank_respects_limit_and_skips_misses() {
        let eps = endpoints();

        let matches = EndpointSearch::new("invoice").rank(&eps, 10);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].endpoint.path, "/v1/invoices/{id}");

        let matches = EndpointSearch::new("v1").rank(&eps, 2);
        assert_eq!(matches.len(), 2);

        assert!(EndpointSearch::new("webhooks").rank(&eps, 10).is_empty());
    }
}
