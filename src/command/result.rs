//! Field iterator over the information text of a response or URC.
//!
//! Lines are selected with [`ResultIter::next`] by prefix, then fields are
//! pulled in the order the modem emits them. Every getter returns `None`
//! (or `false`) on a mismatch, at which point the caller stops decoding
//! that line.

#[derive(Debug, Clone)]
pub struct ResultIter<'a> {
    rest: &'a str,
    line: &'a str,
    pos: usize,
}

impl<'a> ResultIter<'a> {
    pub fn new(response: &'a str) -> Self {
        Self {
            rest: response,
            line: "",
            pos: 0,
        }
    }

    /// Advances to the next line starting with `prefix`, skipping any other
    /// lines. An empty prefix selects the next non-empty line.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self, prefix: &str) -> bool {
        while !self.rest.is_empty() {
            let (line, rest) = match self.rest.find('\n') {
                Some(end) => (&self.rest[..end], &self.rest[end + 1..]),
                None => (self.rest, ""),
            };
            self.rest = rest;

            let line = line.trim_matches(|c| c == '\r' || c == '\n');
            if line.trim().is_empty() || !line.starts_with(prefix) {
                continue;
            }

            self.line = line;
            self.pos = prefix.len();
            self.skip_spaces();
            return true;
        }

        self.line = "";
        self.pos = 0;
        false
    }

    fn peek(&self) -> Option<u8> {
        self.line.as_bytes().get(self.pos).copied()
    }

    fn skip_spaces(&mut self) {
        while self.peek() == Some(b' ') {
            self.pos += 1;
        }
    }

    fn skip_to_next_field(&mut self) {
        if self.peek() == Some(b',') {
            self.pos += 1;
        }
        self.skip_spaces();
    }

    fn take_digits(&mut self) -> Option<u32> {
        let line = self.line;
        let bytes = line.as_bytes();
        let start = self.pos;
        let mut end = start;
        while bytes.get(end).is_some_and(u8::is_ascii_digit) {
            end += 1;
        }
        if end == start {
            return None;
        }

        let value = line[start..end].parse().ok()?;
        self.pos = end;
        Some(value)
    }

    pub fn next_number(&mut self) -> Option<u32> {
        let value = self.take_digits()?;
        self.skip_spaces();
        self.skip_to_next_field();
        Some(value)
    }

    /// A `"quoted"` field. An omitted field (`,,`) reads as `""`.
    pub fn next_string(&mut self) -> Option<&'a str> {
        let line = self.line;
        match self.peek()? {
            b',' => {
                self.skip_to_next_field();
                Some("")
            }
            b'"' => {
                let start = self.pos + 1;
                let end = start + line[start..].find('"')?;
                self.pos = end + 1;
                self.skip_spaces();
                self.skip_to_next_field();
                Some(&line[start..end])
            }
            _ => None,
        }
    }

    /// A bare field running up to the next `,` or `)`.
    pub fn next_unquoted_string(&mut self) -> Option<&'a str> {
        let line = self.line;
        match self.peek()? {
            b'"' | b')' => return None,
            _ => {}
        }

        let start = self.pos;
        let end = line[start..]
            .find(|c| c == ',' || c == ')')
            .map_or(line.len(), |i| start + i);
        self.pos = end;
        self.skip_to_next_field();
        Some(line[start..end].trim_end())
    }

    /// `a-b`, or a single value `a` read as `a-a`.
    pub fn next_range(&mut self) -> Option<(u32, u32)> {
        let saved = self.pos;
        let low = self.take_digits()?;

        let high = if self.peek() == Some(b'-') {
            self.pos += 1;
            match self.take_digits() {
                Some(high) => high,
                None => {
                    self.pos = saved;
                    return None;
                }
            }
        } else {
            low
        };

        self.skip_spaces();
        self.skip_to_next_field();
        Some((low, high))
    }

    /// Skips one field of any kind, including a parenthesised list.
    pub fn skip_next(&mut self) -> bool {
        let line = self.line;
        let bytes = line.as_bytes();

        match self.peek() {
            None => return false,
            Some(b'"') => {
                let Some(end) = line[self.pos + 1..].find('"') else {
                    return false;
                };
                self.pos += end + 2;
            }
            Some(b'(') => {
                let mut depth = 0usize;
                let mut in_string = false;
                loop {
                    match bytes.get(self.pos) {
                        None => return false,
                        Some(b'"') => in_string = !in_string,
                        Some(b'(') if !in_string => depth += 1,
                        Some(b')') if !in_string => {
                            depth -= 1;
                            if depth == 0 {
                                self.pos += 1;
                                break;
                            }
                        }
                        Some(_) => {}
                    }
                    self.pos += 1;
                }
            }
            Some(_) => {
                while bytes.get(self.pos).is_some_and(|b| *b != b',') {
                    self.pos += 1;
                }
            }
        }

        self.skip_spaces();
        self.skip_to_next_field();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_lines() {
        let mut iter = ResultIter::new("\r\n+XDNS: 1, \"8.8.8.8\", \"8.8.4.4\"\r\n+XDNS: 2,\"0.0.0.0\",\"0.0.0.0\"\r\n");

        assert!(iter.next("+XDNS:"));
        assert_eq!(iter.next_number(), Some(1));
        assert_eq!(iter.next_string(), Some("8.8.8.8"));
        assert_eq!(iter.next_string(), Some("8.8.4.4"));
        assert_eq!(iter.next_string(), None);

        assert!(iter.next("+XDNS:"));
        assert_eq!(iter.next_number(), Some(2));

        assert!(!iter.next("+XDNS:"));
        assert_eq!(iter.next_number(), None);
    }

    #[test]
    fn other_lines_are_skipped() {
        let mut iter = ResultIter::new("+CGPADDR: 1,\"10.0.0.1\"\n+CGPADDR: 3,\"10.0.0.3\"");
        assert!(iter.next("+CGPADDR:"));
        assert!(iter.next("+CGPADDR:"));
        assert_eq!(iter.next_number(), Some(3));
        assert_eq!(iter.next_string(), Some("10.0.0.3"));
    }

    #[test]
    fn unquoted_and_skipped_fields() {
        let mut iter = ResultIter::new("+CGEV: NW DEACT \"IP\", \"10.1.2.3\", 3");
        assert!(iter.next("+CGEV:"));
        assert_eq!(iter.next_unquoted_string(), Some("NW DEACT \"IP\""));
        assert!(iter.skip_next());
        assert_eq!(iter.next_number(), Some(3));
        assert!(!iter.skip_next());

        let mut iter = ResultIter::new("+CGCONTRDP: 1,5,\"internet\",\"10.0.0.2.255.255.255.0\"");
        assert!(iter.next("+CGCONTRDP:"));
        assert!(iter.skip_next());
        assert!(iter.skip_next());
        assert!(iter.skip_next());
        assert_eq!(iter.next_string(), Some("10.0.0.2.255.255.255.0"));
    }

    #[test]
    fn omitted_string() {
        let mut iter = ResultIter::new("+CGCONTRDP: \"a\",,\"b\"");
        assert!(iter.next("+CGCONTRDP:"));
        assert_eq!(iter.next_string(), Some("a"));
        assert_eq!(iter.next_string(), Some(""));
        assert_eq!(iter.next_string(), Some("b"));
    }

    #[test]
    fn lists_and_ranges() {
        let mut iter = ResultIter::new("+CGREG: (0-2),(\"PPP\",\"M-RAW_IP\"),5,3-x");
        assert!(iter.next("+CGREG:"));
        assert_eq!(iter.next_range(), None);
        assert!(iter.skip_next());
        assert!(iter.skip_next());
        assert_eq!(iter.next_range(), Some((5, 5)));
        assert_eq!(iter.next_range(), None);
        assert_eq!(iter.next_number(), Some(3));

        let mut iter = ResultIter::new("+CGDCONT: 1-16,\"IP\"");
        assert!(iter.next("+CGDCONT:"));
        assert_eq!(iter.next_range(), Some((1, 16)));
        assert_eq!(iter.next_string(), Some("IP"));

        let mut iter = ResultIter::new("+CGREG: (0,(1,2)),7");
        assert!(iter.next("+CGREG:"));
        assert!(iter.skip_next());
        assert_eq!(iter.next_number(), Some(7));
    }
}
