/// One Simple-TLV data object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimpleTlv<'a> {
    pub tag: u8,
    pub data: &'a [u8],
}

impl SimpleTlv<'_> {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Walks Simple-TLV objects: a tag byte (1..=254), then a length byte, or
/// `0xFF` followed by a two byte big-endian length.
///
/// A tag byte of `0x00` or `0xFF` marks the end of the data.
#[derive(Debug, Clone)]
pub struct SimpleTlvIter<'a> {
    pdu: &'a [u8],
    pos: usize,
}

impl<'a> SimpleTlvIter<'a> {
    pub fn new(pdu: &'a [u8]) -> Self {
        Self { pdu, pos: 0 }
    }

    fn parse(&self) -> Option<(SimpleTlv<'a>, usize)> {
        let mut pos = self.pos;

        let tag = *self.pdu.get(pos)?;
        if tag == 0x00 || tag == 0xff {
            return None;
        }
        pos += 1;

        let mut len = *self.pdu.get(pos)? as usize;
        pos += 1;

        if len == 0xff {
            let ext = self.pdu.get(pos..pos + 2)?;
            len = u16::from_be_bytes([ext[0], ext[1]]) as usize;
            pos += 2;
        }

        let data = self.pdu.get(pos..pos + len)?;
        Some((SimpleTlv { tag, data }, pos + len))
    }
}

impl<'a> Iterator for SimpleTlvIter<'a> {
    type Item = SimpleTlv<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.parse() {
            Some((tlv, next)) => {
                self.pos = next;
                Some(tlv)
            }
            None => {
                self.pos = self.pdu.len();
                None
            }
        }
    }
}
