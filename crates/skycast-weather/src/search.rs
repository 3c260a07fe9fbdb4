//! Search-as-you-type over the geocoding endpoint.

use skycast_core::{Debouncer, SearchConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::client::WeatherClient;
use crate::types::Location;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    pub query: String,
    pub loading: bool,
    pub suggestions: Vec<Location>,
}

/// Debounces typed queries and publishes suggestions on a watch channel.
pub struct CitySearch {
    debouncer: Debouncer<String>,
    state: Arc<watch::Sender<SearchState>>,
    updates: watch::Receiver<SearchState>,
}

impl CitySearch {
    pub fn new(client: WeatherClient, config: &SearchConfig) -> Self {
        let (tx, updates) = watch::channel(SearchState::default());
        let state = Arc::new(tx);
        let min_query_len = config.min_query_len;

        let publisher = Arc::clone(&state);
        let debouncer = Debouncer::new(
            Duration::from_millis(config.debounce_ms),
            move |query: String| {
                if query.chars().count() < min_query_len {
                    publish(&publisher, &query, Vec::new());
                    return;
                }

                let client = client.clone();
                let publisher = Arc::clone(&publisher);
                tokio::spawn(async move {
                    let cities = client.search_cities(&query).await;
                    publish(&publisher, &query, cities);
                });
            },
        );

        Self {
            debouncer,
            state,
            updates,
        }
    }

    /// Feed the current contents of the search box.
    ///
    /// Must be called from within a tokio runtime; outside one the query is
    /// recorded but no search is scheduled.
    pub fn input(&self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            self.debouncer.cancel();
            self.state.send_modify(|s| {
                s.query.clear();
                s.suggestions.clear();
                s.loading = false;
            });
            return;
        }

        self.state.send_modify(|s| {
            s.query = query.to_string();
            s.loading = true;
        });
        if !self.debouncer.call(query.to_string()) {
            self.state.send_modify(|s| s.loading = false);
        }
    }

    pub fn state(&self) -> SearchState {
        self.updates.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.updates.clone()
    }
}

/// Store results for `query` unless the box has moved on to another query
/// (or been cleared) since the search started.
fn publish(state: &watch::Sender<SearchState>, query: &str, cities: Vec<Location>) {
    state.send_if_modified(|s| {
        if s.query != query {
            tracing::debug!("Dropping stale results for '{}'", query);
            return false;
        }
        s.suggestions = cities;
        s.loading = false;
        true
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search() -> CitySearch {
        let client =
            WeatherClient::with_base_urls("key", "http://127.0.0.1:9", "http://127.0.0.1:9").unwrap();
        CitySearch::new(client, &SearchConfig::default())
    }

    #[test]
    fn test_stale_results_are_dropped() {
        let search = search();
        search.state.send_modify(|s| s.query = "Berlin".into());

        publish(&search.state, "Paris", vec![Location::new(48.8566, 2.3522)]);

        let state = search.state();
        assert_eq!(state.query, "Berlin");
        assert!(state.suggestions.is_empty());
    }

    #[test]
    fn test_input_outside_runtime_does_not_panic() {
        let search = search();
        search.input("Paris");
        let state = search.state();
        assert_eq!(state.query, "Paris");
        assert!(!state.loading);
    }
}
