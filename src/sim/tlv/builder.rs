use heapless::Vec;

use super::{length_field_size, write_length, Class, Encoding, Error, MAX_BER_HEADER};

/// Nesting levels a single [`BerBuilder`] can track, root included.
const MAX_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy)]
struct Element {
    class: Class,
    encoding: Encoding,
    tag: u16,
}

/// One BER level, working on `buf[base..base + max]`.
///
/// Each element owns `MAX_BER_HEADER` bytes in front of its value. The
/// header is written right aligned once the value length is final and the
/// gap in front of it is filled with `0xFF` stuffing.
#[derive(Debug)]
struct BerNode {
    base: usize,
    max: usize,
    pos: usize,
    len: usize,
    element: Option<Element>,
    /// Stuffing in front of the first element, known once its header is out.
    lead: usize,
}

impl BerNode {
    fn new(base: usize, max: usize) -> Result<Self, Error> {
        if max < MAX_BER_HEADER {
            return Err(Error::BufferTooSmall);
        }

        Ok(Self {
            base,
            max,
            pos: 0,
            len: 0,
            element: None,
            lead: 0,
        })
    }

    fn data_start(&self) -> usize {
        self.base + self.pos + MAX_BER_HEADER
    }

    fn check(&self, new_len: usize) -> Result<usize, Error> {
        let extent = self.pos + MAX_BER_HEADER + new_len;
        if extent > self.max {
            return Err(Error::Overflow);
        }
        Ok(extent)
    }

    fn apply(&mut self, new_len: usize) -> usize {
        self.len = new_len;
        self.pos + MAX_BER_HEADER + new_len
    }

    fn write_header(&mut self, buf: &mut [u8]) {
        let Some(element) = self.element else {
            return;
        };

        let tag = element.tag;
        let tag_size = match tag {
            0..=0x1e => 1,
            0x1f..=0x7f => 2,
            _ => 3,
        };
        let len_size = length_field_size(self.len);
        let offset = MAX_BER_HEADER - tag_size - len_size;

        let start = self.base + self.pos;
        let header = &mut buf[start..start + MAX_BER_HEADER];
        header[..offset].fill(0xff);

        let mut i = offset;
        let leading = (element.class as u8) << 6 | (element.encoding as u8) << 5;
        header[i] = leading | if tag_size == 1 { tag as u8 } else { 0x1f };
        i += 1;

        if tag_size == 3 {
            header[i] = 0x80 | (tag >> 7) as u8;
            i += 1;
        }
        if tag_size >= 2 {
            header[i] = (tag & 0x7f) as u8;
            i += 1;
        }

        write_length(&mut header[i..], self.len);

        if self.pos == 0 {
            self.lead = offset;
        }
    }
}

/// One Comprehension-TLV level, working on `buf[base..base + max]`.
///
/// Elements are written compactly: growing a length field moves the value
/// bytes already written.
#[derive(Debug)]
struct CtlvNode {
    base: usize,
    max: usize,
    pos: usize,
    len: usize,
    tag_size: usize,
    len_size: usize,
    started: bool,
}

impl CtlvNode {
    fn new(base: usize, max: usize) -> Result<Self, Error> {
        if max < 2 {
            return Err(Error::BufferTooSmall);
        }

        Ok(Self {
            base,
            max,
            pos: 0,
            len: 0,
            tag_size: 0,
            len_size: 0,
            started: false,
        })
    }

    fn element_size(&self) -> usize {
        if self.started {
            self.tag_size + self.len_size + self.len
        } else {
            0
        }
    }

    fn extent(&self) -> usize {
        self.pos + self.element_size()
    }

    fn data_start(&self) -> usize {
        self.base + self.pos + self.tag_size + self.len_size
    }

    fn next(&mut self, buf: &mut [u8], cr: bool, tag: u16) -> Result<usize, Error> {
        if tag == 0 || tag > 0x7fff {
            return Err(Error::InvalidTag);
        }

        let tag_size = if tag < 0x7f { 1 } else { 3 };
        let pos = self.pos + self.element_size();
        if pos + tag_size + 1 > self.max {
            return Err(Error::Overflow);
        }

        let cr = if cr { 0x80 } else { 0x00 };
        let tlv = &mut buf[self.base + pos..];
        if tag_size == 3 {
            tlv[0] = 0x7f;
            tlv[1] = cr | (tag >> 8) as u8;
            tlv[2] = tag as u8;
        } else {
            tlv[0] = cr | tag as u8;
        }
        tlv[tag_size] = 0;

        self.pos = pos;
        self.tag_size = tag_size;
        self.len_size = 1;
        self.len = 0;
        self.started = true;

        Ok(self.extent())
    }

    fn check(&self, new_len: usize) -> Result<usize, Error> {
        if !self.started {
            return Err(Error::NoElement);
        }

        // At most three extension bytes
        let len_size = length_field_size(new_len);
        if len_size > 4 {
            return Err(Error::Overflow);
        }

        let extent = self.pos + self.tag_size + len_size + new_len;
        if extent > self.max {
            return Err(Error::Overflow);
        }
        Ok(extent)
    }

    fn apply(&mut self, buf: &mut [u8], new_len: usize) -> usize {
        let len_size = length_field_size(new_len);
        let tlv = self.base + self.pos;

        let keep = self.len.min(new_len);
        if keep > 0 && len_size != self.len_size {
            let src = tlv + self.tag_size + self.len_size;
            buf.copy_within(src..src + keep, tlv + self.tag_size + len_size);
        }

        write_length(&mut buf[tlv + self.tag_size..], new_len);
        self.len = new_len;
        self.len_size = len_size;

        self.extent()
    }
}

#[derive(Debug)]
enum Node {
    Ber(BerNode),
    Comprehension(CtlvNode),
}

/// Single pass BER-TLV encoder.
///
/// Nested builders are kept as a stack of levels sharing the one output
/// buffer. Every operation works on the innermost level; growing a nested
/// value resizes each enclosing element up to the root, or fails without
/// touching anything when the result would not fit.
///
/// ```ignore
/// let mut buf = [0u8; 64];
/// let mut builder = BerBuilder::new(&mut buf)?;
/// builder.next(Class::ContextSpecific, Encoding::Constructed, 0x0b)?;
/// builder.recurse()?;
/// builder.next(Class::ContextSpecific, Encoding::Primitive, 0x00)?;
/// builder.set_length(1)?;
/// builder.data_mut()[0] = 0x01;
/// let pdu = builder.optimize();
/// ```
#[derive(Debug)]
pub struct BerBuilder<'a> {
    buf: &'a mut [u8],
    nodes: Vec<Node, MAX_DEPTH>,
}

impl<'a> BerBuilder<'a> {
    pub fn new(buf: &'a mut [u8]) -> Result<Self, Error> {
        let root = BerNode::new(0, buf.len())?;
        let mut nodes = Vec::new();
        nodes
            .push(Node::Ber(root))
            .map_err(|_| Error::NestingTooDeep)?;

        Ok(Self { buf, nodes })
    }

    fn top(&mut self) -> &mut Node {
        let top = self.nodes.len() - 1;
        &mut self.nodes[top]
    }

    /// Closes the current element and starts a new, empty one.
    ///
    /// Tags whose first identifier byte would be `0x00` or `0xFF` are
    /// rejected, since readers skip those bytes as padding.
    pub fn next(&mut self, class: Class, encoding: Encoding, tag: u16) -> Result<(), Error> {
        let padding = match (class, encoding) {
            (Class::Universal, Encoding::Primitive) => tag == 0,
            (Class::Private, Encoding::Constructed) => tag >= 0x1f,
            _ => false,
        };
        if tag > 0x3fff || padding {
            return Err(Error::InvalidTag);
        }

        let top = self.nodes.len() - 1;
        let Node::Ber(node) = &mut self.nodes[top] else {
            return Err(Error::WrongBuilder);
        };

        if node.element.is_some() {
            let next_pos = node.pos + MAX_BER_HEADER + node.len;
            if next_pos + MAX_BER_HEADER > node.max {
                return Err(Error::Overflow);
            }
            node.write_header(self.buf);
            node.pos = next_pos;
        }

        node.element = Some(Element {
            class,
            encoding,
            tag,
        });
        node.len = 0;

        self.set_length(0)
    }

    /// Starts a new Comprehension-TLV element inside a
    /// [`recurse_comprehension`](Self::recurse_comprehension) level.
    pub fn next_comprehension(&mut self, cr: bool, tag: u16) -> Result<(), Error> {
        let top = self.nodes.len() - 1;
        let Node::Comprehension(node) = &mut self.nodes[top] else {
            return Err(Error::WrongBuilder);
        };

        // Make sure the enclosing elements can take the new header first
        let extent = node.pos + node.element_size() + if tag < 0x7f { 2 } else { 4 };
        self.check_parents(top, extent)?;

        let Node::Comprehension(node) = &mut self.nodes[top] else {
            return Err(Error::WrongBuilder);
        };
        let extent = node.next(self.buf, cr, tag)?;
        self.apply_parents(top, extent);
        Ok(())
    }

    /// Resizes the value of the current element, propagating the new size
    /// to every enclosing element.
    pub fn set_length(&mut self, new_len: usize) -> Result<(), Error> {
        let top = self.nodes.len() - 1;

        let extent = match &self.nodes[top] {
            Node::Ber(node) => {
                if node.element.is_none() {
                    return Err(Error::NoElement);
                }
                node.check(new_len)?
            }
            Node::Comprehension(node) => node.check(new_len)?,
        };
        self.check_parents(top, extent)?;

        let extent = match &mut self.nodes[top] {
            Node::Ber(node) => node.apply(new_len),
            Node::Comprehension(node) => node.apply(self.buf, new_len),
        };
        self.apply_parents(top, extent);

        Ok(())
    }

    fn check_parents(&self, top: usize, mut extent: usize) -> Result<(), Error> {
        for node in self.nodes[..top].iter().rev() {
            extent = match node {
                Node::Ber(node) => node.check(extent)?,
                Node::Comprehension(_) => return Err(Error::WrongBuilder),
            };
        }
        Ok(())
    }

    fn apply_parents(&mut self, top: usize, mut extent: usize) {
        for node in self.nodes[..top].iter_mut().rev() {
            if let Node::Ber(node) = node {
                extent = node.apply(extent);
            }
        }
    }

    /// Value bytes of the current element.
    pub fn data_mut(&mut self) -> &mut [u8] {
        let (start, len) = match self.top() {
            Node::Ber(node) => (node.data_start(), node.len),
            Node::Comprehension(node) if node.started => (node.data_start(), node.len),
            Node::Comprehension(_) => (0, 0),
        };
        &mut self.buf[start..start + len]
    }

    fn push(&mut self, node: Node) -> Result<(), Error> {
        self.nodes.push(node).map_err(|_| Error::NestingTooDeep)
    }

    fn nested_region(&mut self) -> Result<(usize, usize), Error> {
        let Node::Ber(node) = self.top() else {
            return Err(Error::WrongBuilder);
        };
        if node.element.is_none() {
            return Err(Error::NoElement);
        }
        Ok((node.data_start(), node.max - node.pos - MAX_BER_HEADER))
    }

    /// Starts building BER objects inside the value of the current element.
    pub fn recurse(&mut self) -> Result<(), Error> {
        let (base, max) = self.nested_region()?;
        let node = BerNode::new(base, max)?;
        self.push(Node::Ber(node))
    }

    /// Starts building Comprehension-TLV objects inside the value of the
    /// current element.
    pub fn recurse_comprehension(&mut self) -> Result<(), Error> {
        let (base, max) = self.nested_region()?;
        let node = CtlvNode::new(base, max)?;
        self.push(Node::Comprehension(node))
    }

    /// Finalizes the innermost nested level and returns to its parent.
    pub fn finish_nested(&mut self) -> Result<(), Error> {
        if self.nodes.len() < 2 {
            return Err(Error::WrongBuilder);
        }

        self.close_top();
        Ok(())
    }

    fn close_top(&mut self) {
        if let Some(Node::Ber(mut node)) = self.nodes.pop() {
            node.write_header(self.buf);
        }
    }

    /// Finalizes all open levels and returns the encoded objects without
    /// the leading stuffing bytes.
    pub fn optimize(mut self) -> &'a [u8] {
        while self.nodes.len() > 1 {
            self.close_top();
        }

        let (lead, total) = match self.nodes.first_mut() {
            Some(Node::Ber(root)) if root.element.is_some() => {
                root.write_header(self.buf);
                (root.lead, root.pos + MAX_BER_HEADER + root.len)
            }
            _ => (0, 0),
        };

        let buf: &'a [u8] = self.buf;
        &buf[lead..total]
    }
}

/// Single pass Comprehension-TLV encoder for a flat list of objects.
#[derive(Debug)]
pub struct ComprehensionBuilder<'a> {
    buf: &'a mut [u8],
    node: CtlvNode,
}

impl<'a> ComprehensionBuilder<'a> {
    pub fn new(buf: &'a mut [u8]) -> Result<Self, Error> {
        let node = CtlvNode::new(0, buf.len())?;
        Ok(Self { buf, node })
    }

    pub fn next(&mut self, cr: bool, tag: u16) -> Result<(), Error> {
        self.node.next(self.buf, cr, tag).map(|_| ())
    }

    pub fn set_length(&mut self, new_len: usize) -> Result<(), Error> {
        self.node.check(new_len)?;
        self.node.apply(self.buf, new_len);
        Ok(())
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        if !self.node.started {
            return &mut self.buf[..0];
        }
        let start = self.node.data_start();
        &mut self.buf[start..start + self.node.len]
    }

    /// Returns the encoded objects.
    pub fn finish(self) -> &'a [u8] {
        let end = self.node.extent();
        let buf: &'a [u8] = self.buf;
        &buf[..end]
    }
}
