use super::{read_extended_length, Class, ComprehensionTlvIter, Encoding, SimpleTlvIter};

/// One BER-TLV data object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BerTlv<'a> {
    pub class: Class,
    pub encoding: Encoding,
    /// Tag number, possibly spanning several continuation bytes.
    pub tag: u32,
    pub data: &'a [u8],
}

impl<'a> BerTlv<'a> {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Single byte form of the tag (`0xA3`, `0x80`, ...), or 0 when the tag
    /// number needs continuation bytes.
    pub fn short_tag(&self) -> u8 {
        if self.tag > 30 {
            return 0;
        }
        self.tag as u8 | (self.encoding as u8) << 5 | (self.class as u8) << 6
    }

    /// Iterates the nested BER objects of a constructed value.
    pub fn recurse(&self) -> BerTlvIter<'a> {
        BerTlvIter::new(self.data)
    }

    pub fn recurse_simple(&self) -> SimpleTlvIter<'a> {
        SimpleTlvIter::new(self.data)
    }

    pub fn recurse_comprehension(&self) -> ComprehensionTlvIter<'a> {
        ComprehensionTlvIter::new(self.data)
    }
}

/// Walks BER-TLV objects as defined in ISO/IEC 7816-4. Padding bytes
/// (`0x00`, `0xFF`) between objects are skipped.
#[derive(Debug, Clone)]
pub struct BerTlvIter<'a> {
    pdu: &'a [u8],
    pos: usize,
}

impl<'a> BerTlvIter<'a> {
    pub fn new(pdu: &'a [u8]) -> Self {
        Self { pdu, pos: 0 }
    }

    /// Returns the value of the first object whose short tag matches.
    pub fn find_by_tag(pdu: &'a [u8], short_tag: u8) -> Option<&'a [u8]> {
        Self::new(pdu)
            .find(|tlv| tlv.short_tag() == short_tag)
            .map(|tlv| tlv.data)
    }

    fn parse(&self) -> Option<(BerTlv<'a>, usize)> {
        let pdu = self.pdu;
        let mut pos = self.pos;

        while pdu.get(pos).is_some_and(|b| *b == 0x00 || *b == 0xff) {
            pos += 1;
        }

        let first = *pdu.get(pos)?;
        pos += 1;

        let class = Class::from_bits(first);
        let encoding = Encoding::from_bits(first);
        let mut tag = (first & 0x1f) as u32;

        if tag == 0x1f {
            if *pdu.get(pos)? & 0x7f == 0 {
                return None;
            }

            tag = 0;
            while let Some(b) = pdu.get(pos).filter(|b| **b & 0x80 != 0) {
                tag = (tag << 7) | (*b & 0x7f) as u32;
                pos += 1;
            }

            tag = (tag << 7) | *pdu.get(pos)? as u32;
            pos += 1;
        }

        let mut len = *pdu.get(pos)? as usize;
        pos += 1;

        if len >= 0x80 {
            let n = len - 0x80;
            if n == 0 || n > 4 {
                return None;
            }
            len = read_extended_length(&pdu[pos..], n)?;
            pos += n;
        }

        let data = pdu.get(pos..pos.checked_add(len)?)?;
        Some((
            BerTlv {
                class,
                encoding,
                tag,
                data,
            },
            pos + len,
        ))
    }
}

impl<'a> Iterator for BerTlvIter<'a> {
    type Item = BerTlv<'a>;

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
