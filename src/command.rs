//! Explicit command-argument builder.
//!
//! Replaces the variadic, sentinel-based argument assembly of the original
//! (`skip`/`strv` markers threaded through C varargs) with a small builder
//! that accepts the three shapes call sites actually need: a literal, an
//! optional value, and an ordered list.

#[derive(Debug, Default, Clone)]
pub struct CommandArgs {
    args: Vec<String>,
}

impl CommandArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a literal argument.
    pub fn push(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends an argument only if present; `None` contributes nothing.
    pub fn push_opt(mut self, arg: Option<impl Into<String>>) -> Self {
        if let Some(arg) = arg {
            self.args.push(arg.into());
        }
        self
    }

    /// Appends every element of an ordered list, in order.
    pub fn push_all<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn into_vec(self) -> Vec<String> {
        self.args
    }
}

impl IntoIterator for CommandArgs {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.args.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_expected_argv() {
        let args = CommandArgs::new()
            .push("configure")
            .push_opt(Some("--prefix=/app"))
            .push_opt(None::<String>)
            .push_all(vec!["--enable-foo".to_string(), "--disable-bar".to_string()])
            .into_vec();

        assert_eq!(args, vec!["configure", "--prefix=/app", "--enable-foo", "--disable-bar"]);
    }
}
