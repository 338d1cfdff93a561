//! Wire types and service clients generated from `proto/trees.proto` by
//! `tonic-build`, plus conversions into the directory types.

use crate::RpcError;

tonic::include_proto!("trees.v1");

impl From<MapRoot> for types::SignedMapRoot {
    fn from(root: MapRoot) -> Self {
        types::SignedMapRoot {
            map_revision: root.map_revision,
            root_hash: root.root_hash,
            timestamp_nanos: root.timestamp_nanos,
            metadata: types::MapRootMetadata {
                highest_fully_completed_seq: root.highest_fully_completed_seq,
            },
        }
    }
}

impl From<LogRoot> for types::SignedLogRoot {
    fn from(root: LogRoot) -> Self {
        types::SignedLogRoot {
            tree_size: root.tree_size,
            root_hash: root.root_hash,
            timestamp_nanos: root.timestamp_nanos,
        }
    }
}

impl From<&types::MapLeaf> for MapLeaf {
    fn from(leaf: &types::MapLeaf) -> Self {
        MapLeaf {
            index: leaf.index.as_bytes().to_vec(),
            leaf_value: leaf.leaf_value.clone(),
        }
    }
}

impl TryFrom<MapLeafInclusion> for types::MapLeafInclusion {
    type Error = RpcError;

    fn try_from(pb: MapLeafInclusion) -> Result<Self, RpcError> {
        let leaf = pb
            .leaf
            .ok_or_else(|| RpcError::Malformed("map leaf inclusion without a leaf".into()))?;
        let index = types::Index::from_key(&leaf.index)
            .map_err(|err| RpcError::Malformed(err.to_string()))?;
        Ok(types::MapLeafInclusion {
            leaf: types::MapLeaf { index, leaf_value: leaf.leaf_value },
            inclusion: pb.inclusion,
        })
    }
}

impl From<SignedKv> for types::SignedKv {
    fn from(pb: SignedKv) -> Self {
        types::SignedKv {
            key_value: types::KeyValue { key: pb.key, value: pb.value },
            signatures: pb
                .signatures
                .into_iter()
                .map(|s| (s.key_id, types::DigitallySigned { signature: s.signature }))
                .collect(),
        }
    }
}
