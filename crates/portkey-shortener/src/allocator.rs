use crate::error::ShortenError;
use portkey_core::{LinkRepository, ShortCode};
use rand::Rng;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

const DEFAULT_LENGTH: usize = 6;
const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Allocates short codes for links without a custom alias.
///
/// Draws uniformly from a 62-symbol alphabet and checks the draw against
/// the live set. A collision triggers a redraw; at 6 characters the
/// per-draw collision probability is about 1/62^6, so the attempt cap
/// exists as a backstop, not an expected path. The allocator only decides
/// the code value; the store's uniqueness constraint remains the final
/// arbiter at insert time.
#[derive(Debug, Clone)]
pub struct CodeAllocator {
    length: usize,
    max_attempts: u32,
}

impl CodeAllocator {
    pub fn new(length: usize, max_attempts: u32) -> Self {
        Self {
            length,
            max_attempts,
        }
    }

    /// Draws a code that is free in `repository` at the time of checking.
    pub async fn allocate<R: LinkRepository + ?Sized>(
        &self,
        repository: &R,
    ) -> Result<ShortCode, ShortenError> {
        for _ in 0..self.max_attempts {
            let code = self.draw();
            if !repository.exists(&code).await? {
                return Ok(code);
            }
        }
        Err(ShortenError::AllocationExhausted(self.max_attempts))
    }

    fn draw(&self) -> ShortCode {
        let mut rng = rand::rng();
        let code: String = (0..self.length)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
            .collect();
        ShortCode::new_unchecked(code)
    }
}

impl Default for CodeAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_LENGTH, DEFAULT_MAX_ATTEMPTS)
    }
}
