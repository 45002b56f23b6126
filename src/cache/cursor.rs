// Copyright (c) 2019-present Dmitry Stepanov and Fyrox Engine contributors.
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Resumable depth-first traversal state of a scene tree.

use bitvec::vec::BitVec;

/// Position of a time-sliced scene traversal. It is a plain value: the cache stores it between
/// frames and hands it back to the scene, which continues from where it stopped. The stack has
/// no length limit and the processed set grows with the amount of visited nodes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TraversalCursor {
    stack: Vec<u32>,
    processed: BitVec,
    started: bool,
}

impl TraversalCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new traversal from the given root, forgetting previous progress.
    pub fn begin(&mut self, root: u32) {
        self.reset();
        self.stack.push(root);
        self.started = true;
    }

    /// Forgets all progress.
    pub fn reset(&mut self) {
        self.stack.clear();
        self.processed.clear();
        self.started = false;
    }

    #[inline]
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Returns `true` if a traversal was started and there is nothing left to visit.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.started && self.stack.is_empty()
    }

    #[inline]
    pub fn push(&mut self, node: u32) {
        self.stack.push(node);
    }

    /// Takes the next node to visit, skipping nodes whose subtrees were already completed.
    pub fn pop(&mut self) -> Option<u32> {
        while let Some(node) = self.stack.pop() {
            if !self.is_processed(node) {
                return Some(node);
            }
        }
        None
    }

    /// Marks a node as completed. Returns the previous state of the mark.
    pub fn mark_processed(&mut self, node: u32) -> bool {
        let index = node as usize;
        let previous = if index >= self.processed.len() {
            self.processed.resize(index + 1, false);
            false
        } else {
            self.processed[index]
        };
        self.processed.set(index, true);
        previous
    }

    #[inline]
    pub fn is_processed(&self, node: u32) -> bool {
        self.processed
            .get(node as usize)
            .map(|bit| *bit)
            .unwrap_or_default()
    }

    /// Amount of nodes completed since the traversal began.
    #[inline]
    pub fn processed_count(&self) -> usize {
        self.processed.count_ones()
    }

    /// Amount of nodes waiting to be visited.
    #[inline]
    pub fn pending(&self) -> usize {
        self.stack.len()
    }
}
