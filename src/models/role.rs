use std::fmt;
use std::str::FromStr;

/// What this process does in the protocol. Resolved once from configuration
/// at startup and passed along explicitly; operations never re-inspect it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Distributor,
    Worker,
    Assembler,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Role::Distributor => write!(f, "distributor"),
            Role::Worker => write!(f, "worker"),
            Role::Assembler => write!(f, "assembler"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "distributor" => Ok(Role::Distributor),
            "worker" => Ok(Role::Worker),
            "assembler" => Ok(Role::Assembler),
            other => Err(format!("unknown role `{}`", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_roles() {
        assert_eq!("distributor".parse::<Role>().unwrap(), Role::Distributor);
        assert_eq!("WORKER".parse::<Role>().unwrap(), Role::Worker);
        assert_eq!("Assembler".parse::<Role>().unwrap(), Role::Assembler);
    }

    #[test]
    fn rejects_unknown_role() {
        assert!("master".parse::<Role>().is_err());
    }
}
