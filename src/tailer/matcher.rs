use regex::Regex;

/// Counts lines matching a file's pattern
#[derive(Debug, Clone)]
pub struct LineMatcher {
    /// `None` matches every line
    regex: Option<Regex>,
}

impl LineMatcher {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let regex = if pattern.is_empty() {
            None
        } else {
            Some(Regex::new(pattern)?)
        };
        Ok(Self { regex })
    }

    pub fn is_match(&self, line: &str) -> bool {
        self.regex.as_ref().map_or(true, |re| re.is_match(line))
    }

    /// Number of matching lines in `content`
    pub fn count(&self, content: &str) -> u64 {
        content.lines().filter(|line| self.is_match(line)).count() as u64
    }
}
