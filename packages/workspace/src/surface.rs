//! The editing surface a session reads from and writes back to.

use folio_schema::Block;

/// A rich-text editor view over one document
pub trait EditorSurface: Send {
    /// Blocks currently shown
    fn content(&self) -> Vec<Block>;

    /// Replace what is shown
    fn set_content(&mut self, blocks: &[Block]);

    fn focus(&mut self);
}

/// Surface backed by a plain block list
#[derive(Debug, Default, Clone)]
pub struct BufferSurface {
    blocks: Vec<Block>,
    focused: bool,
}

impl BufferSurface {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            focused: false,
        }
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Direct access, standing in for user typing
    pub fn blocks_mut(&mut self) -> &mut Vec<Block> {
        &mut self.blocks
    }
}

impl EditorSurface for BufferSurface {
    fn content(&self) -> Vec<Block> {
        self.blocks.clone()
    }

    fn set_content(&mut self, blocks: &[Block]) {
        self.blocks = blocks.to_vec();
    }

    fn focus(&mut self) {
        self.focused = true;
    }
}
