//! Robots.txt parser implementation
//!
//! Matching is delegated to the robotstxt crate; this wrapper adds the
//! permissive fallback and `Crawl-delay` extraction.

use robotstxt::DefaultMatcher;

/// Parsed robots.txt rules for one origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRobots {
    /// Raw robots.txt content; `None` means allow everything
    content: Option<String>,
}

impl ParsedRobots {
    /// Creates rules from raw robots.txt content
    ///
    /// Content without any recognizable directive behaves as allow-all, since
    /// the matcher ignores lines it cannot parse.
    pub fn from_content(content: &str) -> Self {
        Self {
            content: Some(content.to_string()),
        }
    }

    /// Creates a permissive rule set that allows everything
    ///
    /// Used whenever robots.txt cannot be fetched or read.
    pub fn allow_all() -> Self {
        Self { content: None }
    }

    /// Returns true if this rule set is the permissive fallback
    pub fn is_allow_all(&self) -> bool {
        self.content.is_none()
    }

    /// Checks if a URL is allowed for the given user agent
    ///
    /// `url` may be a full URL or a path; the matcher extracts the path,
    /// params and query itself.
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        match &self.content {
            None => true,
            Some(content) if content.trim().is_empty() => true,
            Some(content) => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(content, product_token(user_agent), url)
            }
        }
    }

    /// Gets the crawl delay in seconds that applies to `user_agent`
    ///
    /// A group naming the agent wins over the `*` group.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        let content = self.content.as_deref()?;
        let agent = product_token(user_agent).to_lowercase();

        let mut group_agents: Vec<String> = Vec::new();
        let mut in_agent_lines = false;
        let mut wildcard_delay = None;
        let mut agent_delay = None;

        for line in content.lines() {
            // Strip comments before looking for a directive
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            if key == "user-agent" {
                // Consecutive User-agent lines form one group
                if !in_agent_lines {
                    group_agents.clear();
                }
                group_agents.push(value.to_lowercase());
                in_agent_lines = true;
                continue;
            }
            in_agent_lines = false;

            if key != "crawl-delay" {
                continue;
            }
            let Ok(delay) = value.parse::<f64>() else {
                continue;
            };

            if group_agents.iter().any(|ua| ua != "*" && agent.contains(ua.as_str())) {
                agent_delay = Some(delay);
            } else if group_agents.iter().any(|ua| ua == "*") {
                wildcard_delay = Some(delay);
            }
        }

        agent_delay.or(wildcard_delay)
    }
}

/// Reduces a full user agent string ("Bot/1.0 (+info)") to its product token ("Bot")
fn product_token(user_agent: &str) -> &str {
    user_agent
        .split(|c: char| c == '/' || c.is_whitespace())
        .next()
        .filter(|token| !token.is_empty())
        .unwrap_or(user_agent)
}
