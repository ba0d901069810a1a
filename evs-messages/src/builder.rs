use std::fmt::Display;

/// Fills `{variable}` placeholders in a message template.
///
/// Unknown placeholders are left untouched so a missing variable is visible
/// in the output instead of silently disappearing.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    template: String,
    vars: Vec<(String, String)>,
}

impl MessageBuilder {
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
            vars: Vec::new(),
        }
    }

    pub fn var(mut self, key: &str, value: impl Display) -> Self {
        self.vars.push((key.to_string(), value.to_string()));
        self
    }

    pub fn build(self) -> String {
        let mut result = self.template;
        for (key, value) in &self.vars {
            result = result.replace(&format!("{{{}}}", key), value);
        }
        result
    }
}

/// Render a template with named variables.
///
/// ```
/// use evs_messages::{msg, MESSAGES};
/// let line = msg!(MESSAGES.cluster_create_success, name = "prod", cluster_id = "evs-1", status = "CREATING");
/// assert!(line.contains("prod"));
/// ```
#[macro_export]
macro_rules! msg {
    ($template:expr) => {
        $crate::builder::MessageBuilder::new($template).build()
    };
    ($template:expr, $($key:ident = $value:expr),+ $(,)?) => {
        $crate::builder::MessageBuilder::new($template)
            $(.var(stringify!($key), $value))+
            .build()
    };
}
