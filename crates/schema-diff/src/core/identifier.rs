//! Identifier quoting for generated DDL.
//!
//! Generated scripts quote every identifier so that mixed-case and
//! reserved-word names survive round trips.

/// Quote a PostgreSQL identifier: double quotes, internal `"` doubled.
pub fn quote_postgres(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a MariaDB identifier: backticks, internal `` ` `` doubled.
pub fn quote_mariadb(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_postgres() {
        assert_eq!(quote_postgres("users"), "\"users\"");
        assert_eq!(quote_postgres("odd\"name"), "\"odd\"\"name\"");
    }

    #[test]
    fn test_quote_mariadb() {
        assert_eq!(quote_mariadb("users"), "`users`");
        assert_eq!(quote_mariadb("odd`name"), "`odd``name`");
    }
}
