/// Array-backed union-find forest over `0..len`.
///
/// `union` attaches the root of `b` under the root of `a`; `find` compresses
/// the whole path it walks. After every element has been passed to `find`,
/// `root` reads each element's representative in O(1).
#[derive(Debug, Clone)]
pub struct DisjointSet {
    parents: Vec<u32>,
}

impl DisjointSet {
    pub fn new(len: usize) -> Self {
        Self {
            parents: (0..len as u32).collect(),
        }
    }

    /// Merge the sets containing `a` and `b`.
    pub fn union(&mut self, a: usize, b: usize) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a != root_b {
            self.parents[root_b] = root_a as u32;
        }
    }

    /// Representative of `x`, flattening the path to it.
    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parents[root] as usize != root {
            root = self.parents[root] as usize;
        }

        let mut node = x;
        while self.parents[node] as usize != root {
            let next = self.parents[node] as usize;
            self.parents[node] = root as u32;
            node = next;
        }

        root
    }

    /// Current parent of `x`. Equals the representative once `x` has been flattened.
    pub fn root(&self, x: usize) -> usize {
        self.parents[x] as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singletons() {
        let mut set = DisjointSet::new(4);
        for i in 0..4 {
            assert_eq!(set.find(i), i);
            assert_eq!(set.root(i), i);
        }
    }

    #[test]
    fn union_joins_sets() {
        let mut set = DisjointSet::new(6);
        set.union(0, 1);
        set.union(2, 3);
        set.union(1, 3);

        let r = set.find(0);
        assert_eq!(set.find(1), r);
        assert_eq!(set.find(2), r);
        assert_eq!(set.find(3), r);
        assert_ne!(set.find(4), r);
        assert_ne!(set.find(5), set.find(4));
    }

    #[test]
    fn union_attaches_second_under_first() {
        let mut set = DisjointSet::new(3);
        set.union(2, 0);
        assert_eq!(set.find(0), 2);
    }

    #[test]
    fn find_flattens_paths() {
        let mut set = DisjointSet::new(5);
        // Build a chain 4 -> 3 -> 2 -> 1 -> 0
        set.union(0, 1);
        set.union(1, 2);
        set.union(2, 3);
        set.union(3, 4);

        for i in 0..5 {
            set.find(i);
        }
        for i in 0..5 {
            assert_eq!(set.root(i), 0);
        }
    }
}
