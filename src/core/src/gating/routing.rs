/// Chooses the next hop an allowed frame is annotated with.
pub trait RouteSelector: Send + Sync {
    fn next_hop(&self, source: &str, destination: &str) -> String;
}

/// Always returns the same hop, whatever the endpoints.
#[derive(Debug, Clone)]
pub struct FixedRoute {
    hop: String,
}

impl FixedRoute {
    pub fn new(hop: impl Into<String>) -> Self {
        Self { hop: hop.into() }
    }
}

impl Default for FixedRoute {
    fn default() -> Self {
        Self::new("10.0.0.1")
    }
}

impl RouteSelector for FixedRoute {
    fn next_hop(&self, _source: &str, _destination: &str) -> String {
        self.hop.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_route_ignores_endpoints() {
        let route = FixedRoute::default();
        assert_eq!(route.next_hop("10.0.0.5", "127.0.0.1:4000"), "10.0.0.1");
        assert_eq!(route.next_hop("", ""), "10.0.0.1");
        assert_eq!(FixedRoute::new("10.8.0.1").next_hop("a", "b"), "10.8.0.1");
    }
}
