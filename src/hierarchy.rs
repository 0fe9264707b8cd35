//! Directory structure and navigation derived from a [`Catalog`].
//!
//! Stage 2 of the vsite pipeline. The catalog only knows which directories
//! hold videos directly; this stage works out every directory that needs a
//! listing page and how pages link to each other.
//!
//! ## Directory closure
//!
//! A listing page is required for the root, for every directory holding a
//! video, and for every ancestor of those, even when the ancestor holds
//! nothing but subdirectories:
//!
//! ```text
//! a/b/c/clip.mp4   →   "", "a", "a/b", "a/b/c"
//! ```
//!
//! ## Arena
//!
//! Nodes live in a `Vec` and refer to each other by index. Building walks the
//! required paths in sorted order, which always visits a parent before its
//! children, so every parent index exists by the time a child is pushed.
//!
//! ## Ordering and navigation
//!
//! Subdirectories are sorted by name and videos by display name, both
//! byte-wise and case-sensitive. Video sorting is stable, so discovery order
//! breaks ties (two videos only tie on display name when they share a stem,
//! which the name registry rejects anyway). Previous/next links on player
//! pages follow the sorted video list of the owning directory, without
//! wrap-around.
//!
//! Every listing and player filename is claimed through a
//! [`NameRegistry`]; a lossy-flattening collision aborts the build.

use crate::naming::{self, NameCollision, NameRegistry};
use crate::scan::Catalog;
use crate::types::{self, Video};
use std::collections::{BTreeSet, HashMap};

/// One listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryNode {
    /// Relative path, `""` for the root.
    pub path: String,
    /// Page title: the caller's title at the root, the directory name elsewhere.
    pub title: String,
    /// Flat listing filename.
    pub listing_page: String,
    /// Arena index of the parent, `None` at the root.
    pub parent: Option<usize>,
    /// Arena indices of immediate subdirectories, sorted by name.
    pub children: Vec<usize>,
    /// Catalog indices of the videos directly inside, sorted by display name.
    pub videos: Vec<usize>,
}

impl DirectoryNode {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn name(&self) -> &str {
        types::dir_name(&self.path)
    }
}

/// A subdirectory link on a listing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubdirEntry<'a> {
    pub name: &'a str,
    pub link: &'a str,
}

/// Previous/next neighbours of a video, as catalog indices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Navigation {
    pub prev: Option<usize>,
    pub next: Option<usize>,
    /// Arena index of the owning directory.
    pub directory: usize,
}

/// Everything the renderer needs for one listing page.
#[derive(Debug)]
pub struct ListingPage<'a> {
    pub file_name: &'a str,
    pub title: &'a str,
    pub parent_link: Option<&'a str>,
    pub subdirectories: Vec<SubdirEntry<'a>>,
    pub videos: Vec<&'a Video>,
}

/// Everything the renderer needs for one player page.
#[derive(Debug)]
pub struct PlayerPage<'a> {
    pub video: &'a Video,
    pub back_link: &'a str,
    pub prev: Option<&'a Video>,
    pub next: Option<&'a Video>,
}

#[derive(Debug)]
pub struct Hierarchy {
    nodes: Vec<DirectoryNode>,
    by_path: HashMap<String, usize>,
    navigation: Vec<Navigation>,
}

impl Hierarchy {
    /// Derive listing pages and navigation for `catalog`.
    pub fn build(catalog: &Catalog, root_title: &str) -> Result<Self, NameCollision> {
        let mut required: BTreeSet<&str> = BTreeSet::new();
        required.insert("");
        for (dir, _) in catalog.directories() {
            let mut current = Some(dir);
            while let Some(d) = current {
                if !required.insert(d) {
                    break;
                }
                current = types::parent_dir(d);
            }
        }

        let mut registry = NameRegistry::new();
        let mut nodes: Vec<DirectoryNode> = Vec::with_capacity(required.len());
        let mut by_path: HashMap<String, usize> = HashMap::with_capacity(required.len());

        for path in required {
            let parent = types::parent_dir(path).map(|p| by_path[p]);
            let listing_page = naming::listing_page_name(path);
            registry.claim(&listing_page, path)?;

            let mut videos = catalog.videos_in(path).to_vec();
            videos.sort_by(|&a, &b| catalog.get(a).name.cmp(&catalog.get(b).name));

            let title = if path.is_empty() {
                root_title.to_string()
            } else {
                types::dir_name(path).to_string()
            };

            let idx = nodes.len();
            nodes.push(DirectoryNode {
                path: path.to_string(),
                title,
                listing_page,
                parent,
                children: Vec::new(),
                videos,
            });
            by_path.insert(path.to_string(), idx);
            if let Some(p) = parent {
                nodes[p].children.push(idx);
            }
        }

        for i in 0..nodes.len() {
            let mut children = std::mem::take(&mut nodes[i].children);
            children.sort_by(|&a, &b| nodes[a].name().cmp(nodes[b].name()));
            nodes[i].children = children;
        }

        for video in catalog.videos() {
            registry.claim(&video.player_page, &video.relative_path)?;
        }

        let mut navigation = vec![Navigation::default(); catalog.len()];
        for (dir_idx, node) in nodes.iter().enumerate() {
            for (pos, &vi) in node.videos.iter().enumerate() {
                navigation[vi] = Navigation {
                    prev: pos.checked_sub(1).map(|p| node.videos[p]),
                    next: node.videos.get(pos + 1).copied(),
                    directory: dir_idx,
                };
            }
        }

        Ok(Self {
            nodes,
            by_path,
            navigation,
        })
    }

    pub fn nodes(&self) -> &[DirectoryNode] {
        &self.nodes
    }

    pub fn root(&self) -> &DirectoryNode {
        &self.nodes[0]
    }

    pub fn find(&self, path: &str) -> Option<&DirectoryNode> {
        self.by_path.get(path).map(|&i| &self.nodes[i])
    }

    /// Listing filename of the parent directory, `None` at the root.
    pub fn parent_link(&self, node: &DirectoryNode) -> Option<&str> {
        node.parent.map(|p| self.nodes[p].listing_page.as_str())
    }

    pub fn subdirectories<'a>(
        &'a self,
        node: &'a DirectoryNode,
    ) -> impl Iterator<Item = SubdirEntry<'a>> + 'a {
        node.children.iter().map(|&c| SubdirEntry {
            name: self.nodes[c].name(),
            link: &self.nodes[c].listing_page,
        })
    }

    /// Neighbours of the video at `video_idx` in the catalog.
    pub fn navigation(&self, video_idx: usize) -> Navigation {
        self.navigation[video_idx]
    }

    /// Pre-order walk from the root, with depth.
    pub fn walk(&self) -> Vec<(usize, &DirectoryNode)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, depth)) = stack.pop() {
            let node = &self.nodes[idx];
            out.push((depth, node));
            for &child in node.children.iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        out
    }

    /// Listing page records, one per node, root first.
    pub fn listing_pages<'a>(
        &'a self,
        catalog: &'a Catalog,
    ) -> impl Iterator<Item = ListingPage<'a>> + 'a {
        self.nodes.iter().map(move |node| ListingPage {
            file_name: &node.listing_page,
            title: &node.title,
            parent_link: self.parent_link(node),
            subdirectories: self.subdirectories(node).collect(),
            videos: node.videos.iter().map(|&i| catalog.get(i)).collect(),
        })
    }

    /// Player page records, in catalog (discovery) order.
    pub fn player_pages<'a>(
        &'a self,
        catalog: &'a Catalog,
    ) -> impl Iterator<Item = PlayerPage<'a>> + 'a {
        catalog.videos().iter().enumerate().map(move |(i, video)| {
            let nav = self.navigation[i];
            PlayerPage {
                video,
                back_link: &self.nodes[nav.directory].listing_page,
                prev: nav.prev.map(|p| catalog.get(p)),
                next: nav.next.map(|n| catalog.get(n)),
            }
        })
    }
}
