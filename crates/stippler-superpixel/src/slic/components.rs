//! Connected-component cleanup
//!
//! The local search can leave a cluster split over several disjoint
//! regions. Components are found by 4-connected breadth-first search, one
//! component per cluster is kept according to a [`ComponentPolicy`], and
//! every pixel of an unkept component takes the label of the nearest pixel
//! in a kept component.
//!
//! Each phase advances one pixel or cluster at a time so the engine can
//! split it across increments.
//!
//! [`ComponentPolicy`]: super::options::ComponentPolicy

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, VecDeque};

use stippler_core::PixelImage;

use crate::superpixellation::NO_LABEL;

/// Ranking of a component in the largest-component heap
///
/// The heap pops clusters in ascending order, and within a cluster the
/// largest component first, then the lowest component id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ComponentRank {
    cluster: usize,
    size: usize,
    component: usize,
}

impl Ord for ComponentRank {
    fn cmp(&self, other: &Self) -> Ordering {
        (Reverse(self.cluster), self.size, Reverse(self.component)).cmp(&(
            Reverse(other.cluster),
            other.size,
            Reverse(other.component),
        ))
    }
}

impl PartialOrd for ComponentRank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ComponentSearch {
    /// Component id of each pixel
    component_of: Vec<usize>,
    /// Owning cluster of each component
    cluster_of: Vec<usize>,
    /// Pixel count of each component
    sizes: Vec<usize>,
    kept: Vec<bool>,
    visited: Vec<bool>,
    queue: VecDeque<usize>,
    /// Pixels visited by the current reassignment search
    touched: Vec<usize>,
    next_seed: usize,
    heap: BinaryHeap<ComponentRank>,
}

impl ComponentSearch {
    /// Clear all state for an image of `n` pixels
    pub(crate) fn reset(&mut self, n: usize) {
        self.component_of.clear();
        self.component_of.resize(n, NO_LABEL);
        self.visited.clear();
        self.visited.resize(n, false);
        self.cluster_of.clear();
        self.sizes.clear();
        self.kept.clear();
        self.queue.clear();
        self.touched.clear();
        self.heap.clear();
        self.next_seed = 0;
    }

    pub(crate) fn n_components(&self) -> usize {
        self.sizes.len()
    }

    /// Component id of pixel `k`
    #[inline]
    pub(crate) fn component_of(&self, k: usize) -> usize {
        self.component_of[k]
    }

    #[inline]
    pub(crate) fn is_kept(&self, component: usize) -> bool {
        self.kept.get(component).copied().unwrap_or(false)
    }

    /// Visit one pixel of the breadth-first labelling
    ///
    /// When the queue is empty a new component starts at the first
    /// unvisited pixel in raster order. Called exactly once per pixel.
    pub(crate) fn label_next(&mut self, labels: &[usize], image: &PixelImage) {
        let px = match self.queue.pop_front() {
            Some(px) => px,
            None => {
                while self.next_seed < self.visited.len() && self.visited[self.next_seed] {
                    self.next_seed += 1;
                }
                let Some(&seen) = self.visited.get(self.next_seed) else {
                    return;
                };
                debug_assert!(!seen);
                let seed = self.next_seed;
                self.visited[seed] = true;
                self.cluster_of.push(labels[seed]);
                self.sizes.push(0);
                seed
            }
        };

        let component = self.sizes.len() - 1;
        self.component_of[px] = component;
        self.sizes[component] += 1;

        let cluster = labels[px];
        for nb in image.four_neighbours(px).iter() {
            if !self.visited[nb] && labels[nb] == cluster {
                self.visited[nb] = true;
                self.queue.push_back(nb);
            }
        }
    }

    /// Prepare classification; builds the size heap for the largest policy
    pub(crate) fn begin_classification(&mut self, by_size: bool) {
        self.kept.clear();
        self.kept.resize(self.sizes.len(), false);
        self.heap.clear();
        if by_size {
            self.heap = self
                .cluster_of
                .iter()
                .zip(&self.sizes)
                .enumerate()
                .map(|(component, (&cluster, &size))| ComponentRank {
                    cluster,
                    size,
                    component,
                })
                .collect();
        }
    }

    /// Keep the largest component of `cluster`
    ///
    /// Clusters must be classified in ascending order.
    pub(crate) fn keep_largest(&mut self, cluster: usize) {
        while let Some(top) = self.heap.peek() {
            if top.cluster >= cluster {
                break;
            }
            self.heap.pop();
        }
        if let Some(top) = self.heap.peek()
            && top.cluster == cluster
        {
            self.kept[top.component] = true;
            self.heap.pop();
        }
    }

    /// Keep the component under `center_pixel` if that pixel belongs to
    /// `cluster`
    pub(crate) fn keep_containing(&mut self, cluster: usize, center_pixel: usize, labels: &[usize]) {
        if labels.get(center_pixel) == Some(&cluster) {
            let component = self.component_of[center_pixel];
            self.kept[component] = true;
        }
    }

    /// Prepare the reassignment pass
    pub(crate) fn begin_reassignment(&mut self) {
        self.visited.fill(false);
        self.queue.clear();
        self.touched.clear();
    }

    /// Relabel pixel `k` if its component was not kept
    ///
    /// Searches outward from `k` for the nearest 4-connected pixel in a kept
    /// component and adopts its label, moving `k` between the per-cluster
    /// `counts`. Returns `false` only when no kept component is reachable.
    pub(crate) fn reassign(
        &mut self,
        k: usize,
        labels: &mut [usize],
        counts: &mut [usize],
        image: &PixelImage,
    ) -> bool {
        if self.is_kept(self.component_of[k]) {
            return true;
        }

        self.queue.clear();
        self.queue.push_back(k);
        self.visited[k] = true;
        self.touched.push(k);

        let mut found = None;
        'search: while let Some(px) = self.queue.pop_front() {
            for nb in image.four_neighbours(px).iter() {
                if self.visited[nb] {
                    continue;
                }
                if self.is_kept(self.component_of[nb]) {
                    found = Some(labels[nb]);
                    break 'search;
                }
                self.visited[nb] = true;
                self.touched.push(nb);
                self.queue.push_back(nb);
            }
        }

        for &px in &self.touched {
            self.visited[px] = false;
        }
        self.touched.clear();

        match found {
            Some(label) => {
                let old = labels[k];
                if let Some(c) = counts.get_mut(old) {
                    *c = c.saturating_sub(1);
                }
                labels[k] = label;
                counts[label] += 1;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(w: u32, h: u32) -> PixelImage {
        PixelImage::from_lightness(w, h, vec![50.0; (w * h) as usize]).unwrap()
    }

    fn label_all(search: &mut ComponentSearch, labels: &[usize], img: &PixelImage) {
        search.reset(labels.len());
        for _ in 0..labels.len() {
            search.label_next(labels, img);
        }
    }

    #[test]
    fn test_components_per_cluster() {
        // cluster 0 split in two by cluster 1
        let img = image(5, 1);
        let labels = [0, 0, 1, 0, 0];
        let mut s = ComponentSearch::default();
        label_all(&mut s, &labels, &img);
        assert_eq!(s.n_components(), 3);
        assert_eq!(s.component_of, vec![0, 0, 1, 2, 2]);
        assert_eq!(s.sizes, vec![2, 1, 2]);
        assert_eq!(s.cluster_of, vec![0, 1, 0]);
    }

    #[test]
    fn test_largest_tie_keeps_lowest_id() {
        let img = image(5, 1);
        let labels = [0, 0, 1, 0, 0];
        let mut s = ComponentSearch::default();
        label_all(&mut s, &labels, &img);
        s.begin_classification(true);
        s.keep_largest(0);
        s.keep_largest(1);
        assert_eq!(s.kept, vec![true, true, false]);
    }

    #[test]
    fn test_largest_skips_empty_clusters() {
        let img = image(6, 1);
        let labels = [2, 2, 0, 2, 2, 2];
        let mut s = ComponentSearch::default();
        label_all(&mut s, &labels, &img);
        s.begin_classification(true);
        for c in 0..3 {
            s.keep_largest(c);
        }
        // components: [2,2] id 0, [0] id 1, [2,2,2] id 2
        assert_eq!(s.kept, vec![false, true, true]);
    }

    #[test]
    fn test_keep_containing() {
        let img = image(5, 1);
        let labels = [0, 0, 1, 0, 0];
        let mut s = ComponentSearch::default();
        label_all(&mut s, &labels, &img);
        s.begin_classification(false);
        s.keep_containing(0, 4, &labels);
        s.keep_containing(1, 0, &labels);
        assert_eq!(s.kept, vec![false, false, true]);
    }

    #[test]
    fn test_reassign_to_nearest_kept() {
        let img = image(5, 1);
        let mut labels = [0, 0, 1, 0, 0];
        let mut counts = [4, 1];
        let mut s = ComponentSearch::default();
        label_all(&mut s, &labels, &img);
        s.begin_classification(true);
        s.keep_largest(0);
        s.keep_largest(1);
        s.begin_reassignment();
        for k in 0..5 {
            assert!(s.reassign(k, &mut labels, &mut counts, &img));
        }
        // the right half of cluster 0 lost the size tie on component id
        assert_eq!(labels, [0, 0, 1, 1, 1]);
        assert_eq!(counts, [2, 3]);
        assert!(s.visited.iter().all(|v| !v));
    }

    #[test]
    fn test_reassign_without_kept_component() {
        let img = image(2, 1);
        let mut labels = [0, 0];
        let mut counts = [2];
        let mut s = ComponentSearch::default();
        label_all(&mut s, &labels, &img);
        s.begin_classification(false);
        s.begin_reassignment();
        assert!(!s.reassign(0, &mut labels, &mut counts, &img));
        assert_eq!(labels, [0, 0]);
    }
}
