//! Precomputed TF embedding artifacts.
//!
//! An artifact is a `.safetensors` (or PyTorch `.pt`) file holding the
//! per-residue representation of one TF as a `(len, E)` tensor under a
//! configurable key. Loading transposes it to the `(E, len)` layout used by
//! the rest of the pipeline.
//!
//! `.pt` files may also use the layout written by ESM's `extract.py`, where
//! the key maps to a dict of representations indexed by layer number.
use crate::error::{Result, TfBindError};
use candle_core::pickle::{Object, PthTensors, Stack, TensorInfo};
use candle_core::{DType, Device, Tensor};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

const EXTENSIONS: [&str; 2] = ["safetensors", "pt"];

/// Per-TF embedding artifacts under a root directory, addressed by TF name.
#[derive(Debug, Clone)]
pub struct EmbeddingStore {
    root: PathBuf,
    key: String,
    layer: Option<usize>,
    device: Device,
}

impl EmbeddingStore {
    pub fn new<P: Into<PathBuf>>(root: P, key: &str, device: Device) -> Self {
        Self {
            root: root.into(),
            key: key.to_string(),
            layer: None,
            device,
        }
    }

    /// Layer to read from layer-indexed `.pt` artifacts.
    pub fn with_layer(mut self, layer: Option<usize>) -> Self {
        self.layer = layer;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn layer(&self) -> Option<usize> {
        self.layer
    }

    pub fn artifact_path(&self, name: &str) -> Option<PathBuf> {
        EXTENSIONS
            .iter()
            .map(|ext| self.root.join(format!("{name}.{ext}")))
            .find(|p| p.is_file())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.artifact_path(name).is_some()
    }

    /// `(E, len)` embedding for `name`.
    pub fn load(&self, name: &str) -> Result<Tensor> {
        let path = self.artifact_path(name).ok_or_else(|| {
            TfBindError::ArtifactNotFound(self.root.join(format!("{name}.{}", EXTENSIONS[0])))
        })?;
        tracing::debug!("Loading embedding artifact {}", path.display());
        load_embedding_artifact(&path, &self.key, self.layer, &self.device)
    }
}

/// Read a `(len, E)` tensor stored under `key` and return it as `(E, len)` f32.
///
/// `layer` selects the entry of a layer-indexed `.pt` artifact; it may be
/// omitted when the artifact holds a single layer.
pub fn load_embedding_artifact<P: AsRef<Path>>(
    path: P,
    key: &str,
    layer: Option<usize>,
    device: &Device,
) -> Result<Tensor> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(TfBindError::ArtifactNotFound(path.to_path_buf()));
    }
    let is_pth = path
        .extension()
        .is_some_and(|ext| ext == "pt" || ext == "pth");

    let tensor = if is_pth {
        load_pth(path, key, layer)?
    } else {
        let mut tensors = candle_core::safetensors::load(path, &Device::Cpu)
            .map_err(|e| TfBindError::data_unavailable(path, e))?;
        tensors
            .remove(key)
            .ok_or_else(|| TfBindError::data_unavailable(path, format!("no tensor named {key:?}")))?
    };

    if tensor.rank() != 2 {
        return Err(TfBindError::shape_mismatch(
            "embedding artifact",
            "(len, E)",
            tensor.dims(),
        ));
    }
    Ok(tensor
        .to_dtype(DType::F32)?
        .t()?
        .contiguous()?
        .to_device(device)?)
}

fn load_pth(path: &Path, key: &str, layer: Option<usize>) -> Result<Tensor> {
    let tensors = PthTensors::new(path, None).map_err(|e| TfBindError::data_unavailable(path, e))?;
    if let Some(tensor) = tensors
        .get(key)
        .map_err(|e| TfBindError::data_unavailable(path, e))?
    {
        return Ok(tensor);
    }
    load_pth_layer(path, key, layer)?
        .ok_or_else(|| TfBindError::data_unavailable(path, format!("no tensor named {key:?}")))
}

/// `{key: {layer: tensor}}`. Candle's state-dict reader skips integer keys,
/// so the pickle is walked here.
fn load_pth_layer(path: &Path, key: &str, layer: Option<usize>) -> Result<Option<Tensor>> {
    let file = File::open(path).map_err(|e| TfBindError::data_unavailable(path, e))?;
    let mut archive =
        ZipArchive::new(BufReader::new(file)).map_err(|e| TfBindError::data_unavailable(path, e))?;
    let pickle = match archive
        .file_names()
        .find(|name| name.ends_with("data.pkl"))
        .map(str::to_string)
    {
        Some(name) => name,
        None => return Ok(None),
    };
    let object = {
        let entry = archive
            .by_name(&pickle)
            .map_err(|e| TfBindError::data_unavailable(path, e))?;
        let mut stack = Stack::empty();
        stack
            .read_loop(&mut BufReader::new(entry))
            .map_err(|e| TfBindError::data_unavailable(path, e))?;
        stack
            .finalize()
            .map_err(|e| TfBindError::data_unavailable(path, e))?
    };

    let Object::Dict(entries) = object else {
        return Ok(None);
    };
    let layers = match entries
        .into_iter()
        .find(|(k, _)| *k == Object::Unicode(key.to_string()))
    {
        Some((_, Object::Dict(layers))) => layers,
        _ => return Ok(None),
    };
    let available: Vec<i32> = layers
        .iter()
        .filter_map(|(k, _)| match k {
            Object::Int(i) => Some(*i),
            _ => None,
        })
        .collect();
    let value = match layer {
        Some(layer) => layers
            .into_iter()
            .find(|(k, _)| *k == Object::Int(layer as i32))
            .map(|(_, v)| v)
            .ok_or_else(|| {
                TfBindError::data_unavailable(
                    path,
                    format!("{key:?} has no layer {layer}, found {available:?}"),
                )
            })?,
        None if layers.len() == 1 => match layers.into_iter().next() {
            Some((_, v)) => v,
            None => return Ok(None),
        },
        None => {
            return Err(TfBindError::data_unavailable(
                path,
                format!("{key:?} holds layers {available:?}; select one with embedding_layer"),
            ))
        }
    };

    let dir_name = PathBuf::from(pickle.strip_suffix(".pkl").unwrap_or(&pickle));
    let info = value
        .into_tensor_info(Object::Unicode(key.to_string()), &dir_name)
        .map_err(|e| TfBindError::data_unavailable(path, e))?
        .ok_or_else(|| TfBindError::data_unavailable(path, format!("{key:?} is not a tensor")))?;
    read_storage(&mut archive, &info, path).map(Some)
}

fn read_storage<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    info: &TensorInfo,
    path: &Path,
) -> Result<Tensor> {
    if !info.layout.is_contiguous() {
        return Err(TfBindError::data_unavailable(
            path,
            format!("{} is not contiguous", info.name),
        ));
    }
    let elem_size = info.dtype.size_in_bytes();
    let start = info.layout.start_offset() * elem_size;
    let len = info.layout.shape().elem_count() * elem_size;

    let mut bytes = Vec::new();
    archive
        .by_name(&info.path)
        .map_err(|e| TfBindError::data_unavailable(path, e))?
        .read_to_end(&mut bytes)
        .map_err(|e| TfBindError::data_unavailable(path, e))?;
    let data = bytes
        .get(start..start + len)
        .ok_or_else(|| TfBindError::data_unavailable(path, "truncated tensor storage"))?;
    Ok(Tensor::from_raw_buffer(
        data,
        info.dtype,
        info.layout.dims(),
        &Device::Cpu,
    )?)
}

/// Write an `(E, len)` embedding as a `(len, E)` artifact under `key`.
pub fn save_embedding_artifact<P: AsRef<Path>>(embedding: &Tensor, key: &str, path: P) -> Result<()> {
    let stored = embedding
        .to_device(&Device::Cpu)?
        .to_dtype(DType::F32)?
        .t()?
        .contiguous()?;
    stored.save_safetensors(key, path.as_ref())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    fn unicode(pkl: &mut Vec<u8>, text: &str) {
        pkl.push(b'X');
        pkl.extend((text.len() as u32).to_le_bytes());
        pkl.extend(text.as_bytes());
    }

    /// torch.save({"representations": {layer: t}}) for each `(layer, t)`,
    /// with `t` a `(rows.len(), 2)` float tensor.
    fn write_layered_pt(path: &Path, layers: &[(u8, &[[f32; 2]])]) -> anyhow::Result<()> {
        let mut pkl = vec![0x80, 2, b'}'];
        unicode(&mut pkl, "representations");
        pkl.push(b'}');
        for (storage, (layer, rows)) in layers.iter().enumerate() {
            pkl.extend([b'K', *layer]);
            pkl.extend(b"ctorch._utils\n_rebuild_tensor_v2\n(");
            // persistent id: ("storage", FloatStorage, key, "cpu", numel)
            pkl.push(b'(');
            unicode(&mut pkl, "storage");
            pkl.extend(b"ctorch\nFloatStorage\n");
            unicode(&mut pkl, &storage.to_string());
            unicode(&mut pkl, "cpu");
            pkl.extend([b'K', (rows.len() * 2) as u8, b't', b'Q']);
            // offset, size, stride, requires_grad, backward hooks
            pkl.extend([b'K', 0, b'K', rows.len() as u8, b'K', 2, 0x86, b'K', 2, b'K', 1, 0x86]);
            pkl.push(0x89);
            pkl.extend(b"ccollections\nOrderedDict\n)R");
            pkl.extend([b't', b'R', b's']);
        }
        pkl.extend([b's', b'.']);

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let mut zip = ZipWriter::new(File::create(path)?);
        zip.start_file("archive/data.pkl", options)?;
        zip.write_all(&pkl)?;
        for (storage, (_, rows)) in layers.iter().enumerate() {
            zip.start_file(format!("archive/data/{storage}"), options)?;
            for value in rows.iter().flatten() {
                zip.write_all(&value.to_le_bytes())?;
            }
        }
        zip.finish()?;
        Ok(())
    }

    #[test]
    fn test_artifact_transposed_on_load() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        // stored as (len=3, E=2)
        let stored = Tensor::new(&[[1f32, 2.], [3., 4.], [5., 6.]], &Device::Cpu)?;
        stored.save_safetensors("representations", dir.path().join("ESR1.safetensors"))?;

        let store = EmbeddingStore::new(dir.path(), "representations", Device::Cpu);
        assert!(store.contains("ESR1"));
        let loaded = store.load("ESR1")?;
        assert_eq!(loaded.dims2()?, (2, 3));
        assert_eq!(loaded.to_vec2::<f32>()?, vec![vec![1., 3., 5.], vec![2., 4., 6.]]);
        Ok(())
    }

    #[test]
    fn test_round_trip_through_save() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("TF.safetensors");
        let embedding = Tensor::arange(0f32, 12f32, &Device::Cpu)?.reshape((4, 3))?;
        save_embedding_artifact(&embedding, "representations", &path)?;
        let loaded = load_embedding_artifact(&path, "representations", None, &Device::Cpu)?;
        assert_eq!(loaded.to_vec2::<f32>()?, embedding.to_vec2::<f32>()?);
        Ok(())
    }

    #[test]
    fn test_missing_artifact_and_key() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = EmbeddingStore::new(dir.path(), "representations", Device::Cpu);
        assert!(matches!(
            store.load("FOXP1"),
            Err(TfBindError::ArtifactNotFound(_))
        ));

        Tensor::zeros((2, 2), DType::F32, &Device::Cpu)?
            .save_safetensors("other", dir.path().join("ERF.safetensors"))?;
        assert!(matches!(
            store.load("ERF"),
            Err(TfBindError::DataUnavailable { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_wrong_rank() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        Tensor::zeros((2, 2, 2), DType::F32, &Device::Cpu)?
            .save_safetensors("representations", dir.path().join("ERF.safetensors"))?;
        let store = EmbeddingStore::new(dir.path(), "representations", Device::Cpu);
        assert!(matches!(
            store.load("ERF"),
            Err(TfBindError::ShapeMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_layer_indexed_pt() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let rows: &[[f32; 2]] = &[[1., 2.], [3., 4.], [5., 6.]];
        write_layered_pt(&dir.path().join("ESR1.pt"), &[(36, rows)])?;

        // a single layer needs no selection
        let store = EmbeddingStore::new(dir.path(), "representations", Device::Cpu);
        let loaded = store.load("ESR1")?;
        assert_eq!(loaded.to_vec2::<f32>()?, vec![vec![1., 3., 5.], vec![2., 4., 6.]]);

        let store = store.with_layer(Some(36));
        assert_eq!(store.load("ESR1")?.dims2()?, (2, 3));
        let store = EmbeddingStore::new(dir.path(), "representations", Device::Cpu)
            .with_layer(Some(33));
        assert!(matches!(
            store.load("ESR1"),
            Err(TfBindError::DataUnavailable { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_pt_with_several_layers() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("ERF.pt");
        let early: &[[f32; 2]] = &[[0., 0.]];
        let last: &[[f32; 2]] = &[[7., 8.], [9., 10.]];
        write_layered_pt(&path, &[(6, early), (12, last)])?;

        assert!(matches!(
            load_embedding_artifact(&path, "representations", None, &Device::Cpu),
            Err(TfBindError::DataUnavailable { .. })
        ));
        let loaded = load_embedding_artifact(&path, "representations", Some(12), &Device::Cpu)?;
        assert_eq!(loaded.to_vec2::<f32>()?, vec![vec![7., 9.], vec![8., 10.]]);
        Ok(())
    }
}
