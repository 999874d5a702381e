use std::collections::HashMap;

/// Namespace the expression is checked in. Resolution of a simple name `n`
/// inside container `a.b` tries `a.b.n`, `a.n`, `n` in that order; a
/// leading dot forces an absolute reference.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Container {
    name: String,
    /// Alias from a leading name segment to its fully qualified expansion.
    aliases: HashMap<String, String>,
}

impl Container {
    pub fn new(name: impl ToString) -> Container {
        Container {
            name: name.to_string(),
            aliases: HashMap::new(),
        }
    }

    pub fn with_aliases(
        name: impl ToString,
        aliases: impl IntoIterator<Item = (String, String)>,
    ) -> Container {
        Container {
            name: name.to_string(),
            aliases: aliases.into_iter().collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Candidate resolution names for `name`, most specific first.
    pub fn candidates(&self, name: &str) -> Vec<String> {
        if let Some(absolute) = name.strip_prefix('.') {
            return vec![absolute.to_string()];
        }

        let leading = name.split('.').next().unwrap_or(name);
        if let Some(expansion) = self.aliases.get(leading) {
            let expanded = format!("{expansion}{}", &name[leading.len()..]);
            return vec![expanded];
        }

        let mut out = vec![];
        let mut prefix = self.name.as_str();
        while !prefix.is_empty() {
            out.push(format!("{prefix}.{name}"));
            prefix = match prefix.rfind('.') {
                Some(idx) => &prefix[..idx],
                None => "",
            };
        }
        out.push(name.to_string());

        out
    }
}

#[cfg(test)]
mod tests {
    use super::Container;

    #[test]
    fn test_empty_container() {
        let container = Container::default();
        assert_eq!(container.candidates("x"), vec!["x"]);
    }

    #[test]
    fn test_nested_container() {
        let container = Container::new("a.b.c");
        assert_eq!(
            container.candidates("n"),
            vec!["a.b.c.n", "a.b.n", "a.n", "n"]
        );
    }

    #[test]
    fn test_absolute_reference() {
        let container = Container::new("a.b");
        assert_eq!(container.candidates(".n.m"), vec!["n.m"]);
    }

    #[test]
    fn test_alias() {
        let container = Container::with_aliases(
            "a",
            [("pb".to_string(), "google.protobuf".to_string())],
        );
        assert_eq!(container.candidates("pb.Duration"), vec!["google.protobuf.Duration"]);
    }
}
