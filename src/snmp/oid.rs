use snmp2::Oid;

use super::SessionError;

/// Парсит строку OID ("1.3.6.1.2.1.1.2.0") в объект Oid
pub fn parse_oid(s: &str) -> Result<Oid<'static>, SessionError> {
    let parts: Result<Vec<u64>, _> = s
        .trim()
        .split('.')
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<u64>())
        .collect();

    let parts = parts.map_err(|_| SessionError::InvalidOid(s.to_string()))?;
    Oid::from(&parts).map_err(|e| SessionError::InvalidOid(format!("{}: {:?}", s, e)))
}

/// Каноническая запись OID, как её возвращает агент: без ведущей точки и пробелов
pub fn canonical_oid(s: &str) -> String {
    s.trim()
        .split('.')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_form_matches_agent_output() {
        assert_eq!(canonical_oid(" .1.3.6.1.2.1.1.3.0 "), "1.3.6.1.2.1.1.3.0");
        assert_eq!(canonical_oid("1.3.6.1.2.1.1.3.0"), "1.3.6.1.2.1.1.3.0");
        assert_eq!(canonical_oid("1.3.6.1.x.1"), "1.3.6.1.x.1");
        let parsed = parse_oid(".1.3.6.1.2.1.1.3.0").unwrap();
        assert_eq!(parsed.to_string(), canonical_oid(".1.3.6.1.2.1.1.3.0"));
    }

    #[test]
    fn rejects_placeholder_left_in_address() {
        assert!(matches!(
            parse_oid("1.3.6.1.x.1"),
            Err(SessionError::InvalidOid(_))
        ));
    }

    #[test]
    fn parses_leading_dot() {
        let oid = parse_oid(".1.3.6.1.2.1.1.2.0").unwrap();
        assert_eq!(oid.to_string(), "1.3.6.1.2.1.1.2.0");
    }
}
