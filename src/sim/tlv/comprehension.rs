use super::read_extended_length;

/// One Comprehension-TLV data object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComprehensionTlv<'a> {
    /// Tag value, 1..=0x7FFF, without the comprehension-required flag.
    pub tag: u16,
    /// Comprehension required flag.
    pub cr: bool,
    pub data: &'a [u8],
}

impl ComprehensionTlv<'_> {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Walks Comprehension-TLV objects as defined in ETSI TS 101.220 7.1.1.
#[derive(Debug, Clone)]
pub struct ComprehensionTlvIter<'a> {
    pdu: &'a [u8],
    pos: usize,
}

impl<'a> ComprehensionTlvIter<'a> {
    pub fn new(pdu: &'a [u8]) -> Self {
        Self { pdu, pos: 0 }
    }

    fn parse(&self) -> Option<(ComprehensionTlv<'a>, usize)> {
        let mut pos = self.pos;

        let first = *self.pdu.get(pos)?;
        if first == 0x00 || first == 0xff || first == 0x80 {
            return None;
        }
        pos += 1;

        let mut cr = first & 0x80 != 0;
        let mut tag = (first & 0x7f) as u16;

        // Two byte tag, the CR flag moves to the first of them
        if tag == 0x7f {
            let ext = self.pdu.get(pos..pos + 2)?;
            cr = ext[0] & 0x80 != 0;
            tag = (((ext[0] & 0x7f) as u16) << 8) | ext[1] as u16;
            if tag == 0 {
                return None;
            }
            pos += 2;
        }

        let mut len = *self.pdu.get(pos)? as usize;
        pos += 1;

        if len >= 0x80 {
            let n = len - 0x80;
            if n == 0 || n > 3 {
                return None;
            }
            len = read_extended_length(&self.pdu[pos..], n)?;
            pos += n;
        }

        let data = self.pdu.get(pos..pos + len)?;
        Some((ComprehensionTlv { tag, cr, data }, pos + len))
    }
}

impl<'a> Iterator for ComprehensionTlvIter<'a> {
    type Item = ComprehensionTlv<'a>;

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
