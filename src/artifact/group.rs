use crate::tensor::Tensor;

/// Weights stored for one layer, in the layer's storage order.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub name: String,
    pub tensors: Vec<(String, Tensor)>,
}

impl Group {
    pub fn params(&self) -> usize {
        self.tensors.iter().map(|(_, t)| t.size()).sum()
    }
}

impl std::fmt::Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        for (name, tensor) in self.tensors.iter() {
            write!(f, " {}{:?}", name, tensor.shape())?;
        }
        Ok(())
    }
}
