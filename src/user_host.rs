use std::fmt;

use log::warn;

/// The parsed object representation of `"{user}@{host}"` where `@{host}` is optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserHostRef<'a> {
    user: &'a str,
    host: Option<&'a str>,
}

impl<'a> UserHostRef<'a> {
    pub fn new(user: &'a str, host: Option<&'a str>) -> Self {
        Self { user, host }
    }

    pub fn parse(value: &'a str) -> Self {
        match value.split_once('@') {
            Some((user, host)) => Self::new(user, Some(host)),
            None => Self::new(value, None),
        }
    }

    #[inline]
    pub fn user(&self) -> &'a str {
        self.user
    }

    #[inline]
    pub fn host(&self) -> Option<&'a str> {
        self.host
    }
}

impl fmt::Display for UserHostRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let user = self.user();
        match self.host() {
            Some(host) => write!(f, "{user}@{host}"),
            None => write!(f, "{user}"),
        }
    }
}

/// `user@host` of whoever is running this process, used to annotate the resources we create.
pub fn machine_user_host() -> String {
    let user = whoami::username();
    let host = whoami::fallible::hostname()
        .inspect_err(|error| {
            warn!("Unable to determine hostname: {error}");
        })
        .ok();
    UserHostRef::new(&user, host.as_deref()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! user_host_test {
        ($input:expr, $user:expr, $host:expr) => {
            let value = UserHostRef::parse($input);
            assert_eq!(value.user(), $user);
            assert_eq!(value.host(), $host);
            assert_eq!(value.to_string(), $input);
        };
    }

    #[test]
    fn with_host() {
        user_host_test!("ray@workstation.local", "ray", Some("workstation.local"));
    }

    #[test]
    fn without_host() {
        user_host_test!("ray", "ray", None);
    }
}
