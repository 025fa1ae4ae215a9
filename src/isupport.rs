//! RPL_ISUPPORT (005) tokens.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IsupportEntry<'a> {
    pub key: &'a str,
    pub value: Option<&'a str>,
    pub negated: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Isupport<'a> {
    entries: Vec<IsupportEntry<'a>>,
}

impl<'a> Isupport<'a> {
    pub fn parse_params(params: &[&'a str]) -> Self {
        let mut entries = Vec::with_capacity(params.len());
        for &p in params {
            if p.is_empty() || p.contains(' ') {
                continue;
            }
            let (negated, p) = match p.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, p),
            };
            let (key, value) = match p.split_once('=') {
                Some((k, v)) => (k, Some(v)),
                None => (p, None),
            };
            entries.push(IsupportEntry { key, value, negated });
        }
        Isupport { entries }
    }

    /// Tokens from a 005 argument list: the first argument is our nick and
    /// the final "are supported by this server" text is skipped.
    pub fn from_response_args(args: &[&'a str]) -> Option<Self> {
        let (_, tokens) = args.split_first()?;
        Some(Self::parse_params(tokens))
    }

    pub fn iter(&self) -> impl Iterator<Item = &IsupportEntry<'a>> {
        self.entries.iter()
    }

    pub fn get(&self, key: &str) -> Option<Option<&'a str>> {
        self.entries
            .iter()
            .rfind(|e| !e.negated && e.key.eq_ignore_ascii_case(key))
            .map(|e| e.value)
    }

    pub fn casemapping(&self) -> Option<&'a str> {
        self.get("CASEMAPPING").flatten()
    }

    pub fn chantypes(&self) -> Option<&'a str> {
        self.get("CHANTYPES").flatten()
    }

    pub fn network(&self) -> Option<&'a str> {
        self.get("NETWORK").flatten()
    }

    pub fn nicklen(&self) -> Option<usize> {
        self.get("NICKLEN").flatten().and_then(|v| v.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_response_args() {
        let args = [
            "me",
            "CHANTYPES=#",
            "NETWORK=Libera.Chat",
            "NICKLEN=16",
            "EXCEPTS",
            "are supported by this server",
        ];
        let is = Isupport::from_response_args(&args).unwrap();
        assert_eq!(is.chantypes(), Some("#"));
        assert_eq!(is.network(), Some("Libera.Chat"));
        assert_eq!(is.nicklen(), Some(16));
        assert_eq!(is.get("EXCEPTS"), Some(None));
        assert_eq!(is.iter().count(), 4);
    }

    #[test]
    fn test_negated_token() {
        let is = Isupport::parse_params(&["-CHANTYPES"]);
        assert_eq!(is.chantypes(), None);
        assert!(is.iter().next().unwrap().negated);
    }

    #[test]
    fn test_empty_chantypes_value() {
        let is = Isupport::parse_params(&["CHANTYPES="]);
        assert_eq!(is.chantypes(), Some(""));
    }
}
