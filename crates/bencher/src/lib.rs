//! Shared inputs for the decoder benchmarks.

use nano_http::ws::{Frame, opcode};
use tokio_util::bytes::BytesMut;

pub static SMALL_HEADER: TestFile = TestFile::new("get_small.txt", include_str!("../resources/request/get_small.txt"));
pub static LARGE_HEADER: TestFile = TestFile::new("get_large.txt", include_str!("../resources/request/get_large.txt"));
pub static POST_FORM: TestFile = TestFile::new("post_form.txt", include_str!("../resources/request/post_form.txt"));

const MASK: [u8; 4] = [0x37, 0xfa, 0x21, 0x3d];

#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    file: TestFile,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, file: TestFile) -> Self {
        Self { name, group, file }
    }

    pub fn small(name: &'static str, file: TestFile) -> Self {
        Self::new(name, TestGroup::Small, file)
    }

    pub fn normal(name: &'static str, file: TestFile) -> Self {
        Self::new(name, TestGroup::Normal, file)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn file(&self) -> &TestFile {
        &self.file
    }
}

/// A raw request, as a client would send it.
#[derive(Debug, Copy, Clone)]
pub struct TestFile {
    file_name: &'static str,
    content: &'static str,
}

impl TestFile {
    pub const fn new(file_name: &'static str, content: &'static str) -> Self {
        Self { file_name, content }
    }

    pub fn content(&self) -> &'static str {
        self.content
    }

    pub fn file_name(&self) -> &'static str {
        self.file_name
    }
}

#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Small,
    Normal,
}

/// Masked client frames carrying `size` bytes split into `fragments` frames.
pub fn client_message(size: usize, fragments: usize) -> BytesMut {
    let payload = vec![b'x'; size];
    let chunk = size.div_ceil(fragments).max(1);
    let chunks: Vec<&[u8]> = payload.chunks(chunk).collect();

    let mut wire = BytesMut::new();
    for (i, part) in chunks.iter().enumerate() {
        let opcode = if i == 0 { opcode::BINARY } else { opcode::CONTINUATION };
        Frame::new(opcode, part.to_vec())
            .fin(i == chunks.len() - 1)
            .masked(MASK)
            .encode(&mut wire)
            .expect("benchmark frames stay below every ceiling");
    }
    wire
}
