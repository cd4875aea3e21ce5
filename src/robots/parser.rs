//! Robots.txt rule evaluation
//!
//! Allow/disallow matching is delegated to the robotstxt crate (Google's
//! matcher). Crawl-delay is not part of that matcher, so it is read here.

use robotstxt::DefaultMatcher;

/// Rules of one robots.txt file
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    content: String,
}

impl ParsedRobots {
    /// Wraps raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }

    /// Checks if a URL is allowed for the given product token
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL to check
    /// * `product_token` - The bot name robots.txt groups are matched against
    pub fn is_allowed(&self, url: &str, product_token: &str) -> bool {
        if self.content.trim().is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, product_token, url)
    }

    /// Crawl-delay declared for a product token, in seconds
    ///
    /// A group naming the agent wins over the `*` group. Consecutive
    /// `User-agent` lines share the directives that follow them.
    pub fn crawl_delay(&self, product_token: &str) -> Option<f64> {
        let agent = product_token.to_lowercase();
        let mut group: Vec<String> = Vec::new();
        let mut in_directives = false;
        let mut specific = None;
        let mut wildcard = None;

        for line in self.content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match key.trim().to_lowercase().as_str() {
                "user-agent" => {
                    if in_directives {
                        group.clear();
                        in_directives = false;
                    }
                    group.push(value.to_lowercase());
                }
                "crawl-delay" => {
                    in_directives = true;
                    let Ok(delay) = value.parse::<f64>() else {
                        continue;
                    };
                    if group.iter().any(|ua| ua != "*" && !ua.is_empty() && agent.contains(ua.as_str())) {
                        specific.get_or_insert(delay);
                    } else if group.iter().any(|ua| ua == "*") {
                        wildcard.get_or_insert(delay);
                    }
                }
                _ => in_directives = true,
            }
        }

        specific.or(wildcard)
    }
}
