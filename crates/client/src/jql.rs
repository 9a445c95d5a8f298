/// Builds JQL from filter values, quoting and escaping as Jira expects.
#[derive(Debug, Default, Clone)]
pub struct JqlBuilder {
    conditions: Vec<String>,
    order_by: Option<String>,
}

impl JqlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `field = value`, with `@me` and `unassigned` shorthands.
    pub fn eq(mut self, field: &str, value: &str) -> Self {
        let normalized = normalize_value(field, value);
        self.conditions.push(format!("{field} = {normalized}"));
        self
    }

    /// `field IN (...)`; an empty list adds nothing.
    pub fn in_list(mut self, field: &str, values: &[String]) -> Self {
        if values.is_empty() {
            return self;
        }

        let quoted: Vec<String> = values.iter().map(|v| quote(v)).collect();
        self.conditions
            .push(format!("{field} IN ({})", quoted.join(", ")));
        self
    }

    /// `field ~ "value"` (text search).
    pub fn contains(mut self, field: &str, value: &str) -> Self {
        self.conditions.push(format!("{field} ~ {}", quote(value)));
        self
    }

    pub fn order_by(mut self, clause: &str) -> Self {
        self.order_by = Some(clause.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn finish(self) -> String {
        let mut query = self.conditions.join(" AND ");
        if let Some(order) = self.order_by {
            if !query.is_empty() {
                query.push(' ');
            }
            query.push_str("ORDER BY ");
            query.push_str(&order);
        }
        query
    }
}

/// Double-quotes a JQL value, escaping backslashes and quotes.
pub fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

fn normalize_value(field: &str, value: &str) -> String {
    match (field, value) {
        ("assignee" | "reporter" | "creator" | "watcher", "@me") => "currentUser()".to_string(),
        (_, "unassigned" | "none" | "empty") => "EMPTY".to_string(),
        _ => quote(value),
    }
}
