/*
 *  textfit.rs
 *
 *  Earshot - what's playing, on paper
 *  (c) 2020-26 Stuart Hunter
 *
 *  Greedy word wrapping against a pixel width
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

/// Lazily splits text into lines no wider than `max_width` pixels.
///
/// Each line is the longest whitespace-separated word prefix of the
/// remaining text that fits, found by binary search over the word count.
/// A lone word wider than the box is still emitted on its own line, so the
/// iterator always ends. `rewind` starts it over from the first word.
#[derive(Clone)]
pub struct FitLines<'a, M> {
    words: Vec<&'a str>,
    pos: usize,
    max_width: u32,
    measure: M,
}

impl<'a, M> FitLines<'a, M>
where
    M: Fn(&str) -> u32,
{
    pub fn new(text: &'a str, max_width: u32, measure: M) -> Self {
        Self {
            words: text.split_whitespace().collect(),
            pos: 0,
            max_width,
            measure,
        }
    }

    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    fn join(&self, count: usize) -> String {
        self.words[self.pos..self.pos + count].join(" ")
    }
}

impl<'a, M> Iterator for FitLines<'a, M>
where
    M: Fn(&str) -> u32,
{
    type Item = (String, u32);

    fn next(&mut self) -> Option<Self::Item> {
        let left = self.words.len() - self.pos;
        if left == 0 {
            return None;
        }

        // largest word count in [1, left] whose joined width fits
        let (mut lo, mut hi) = (1usize, left);
        while lo < hi {
            let mid = lo + (hi - lo).div_ceil(2);
            if (self.measure)(&self.join(mid)) <= self.max_width {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }

        let line = self.join(lo);
        let width = (self.measure)(&line);
        self.pos += lo;
        Some((line, width))
    }
}

pub fn fit_lines<M>(text: &str, max_width: u32, measure: M) -> FitLines<'_, M>
where
    M: Fn(&str) -> u32,
{
    FitLines::new(text, max_width, measure)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 6px per character, like the 6x10 mono font
    fn mono(s: &str) -> u32 {
        s.chars().count() as u32 * 6
    }

    #[test]
    fn wraps_to_width() {
        let lines: Vec<_> = fit_lines("the quick brown fox jumps", 60, mono).collect();
        assert_eq!(
            lines,
            vec![
                ("the quick".to_string(), 54),
                ("brown fox".to_string(), 54),
                ("jumps".to_string(), 30),
            ]
        );
    }

    #[test]
    fn oversized_word_is_emitted_alone() {
        let lines: Vec<_> = fit_lines("a Supercalifragilistic b", 30, mono).map(|(l, _)| l).collect();
        assert_eq!(lines, vec!["a", "Supercalifragilistic", "b"]);
    }

    #[test]
    fn empty_and_blank_text_yield_nothing() {
        assert_eq!(fit_lines("", 100, mono).count(), 0);
        assert_eq!(fit_lines("   \t ", 100, mono).count(), 0);
    }

    #[test]
    fn rewind_restarts() {
        let mut it = fit_lines("one two three", 24, mono);
        let first: Vec<_> = it.by_ref().collect();
        assert!(it.next().is_none());
        it.rewind();
        let second: Vec<_> = it.collect();
        assert_eq!(first, second);
    }
}
