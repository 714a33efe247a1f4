use crate::Probability;
use crate::tensor::Tensor;

/// Model outputs for one labelled batch, one row per image.
#[derive(Debug, Clone, PartialEq)]
pub struct Predictions {
    pub label: String,
    pub names: Vec<String>,
    pub outputs: Tensor,
}

impl Predictions {
    pub fn len(&self) -> usize {
        self.outputs.batch()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// output vector length
    pub fn classes(&self) -> usize {
        self.outputs.shape().last().copied().unwrap_or(0)
    }
    /// index of the largest score per image, first wins on ties
    pub fn argmax(&self) -> Vec<usize> {
        self.outputs
            .rows()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .fold((0, Probability::NEG_INFINITY), |(i, max), (j, v)| {
                        if *v > max { (j, *v) } else { (i, max) }
                    })
                    .0
            })
            .collect()
    }
    pub fn sums(&self) -> Vec<Probability> {
        self.outputs.rows().map(|row| row.iter().sum()).collect()
    }
    /// how often each class wins, padded to `classes`
    pub fn bincount(&self, classes: usize) -> Vec<usize> {
        let argmax = self.argmax();
        let width = argmax.iter().map(|i| i + 1).max().unwrap_or(0).max(classes);
        let mut counts = vec![0; width];
        for i in argmax {
            counts[i] += 1;
        }
        counts
    }
    /// same winning class for every image
    pub fn collapsed(&self) -> bool {
        self.argmax().windows(2).all(|w| w[0] == w[1])
    }
    /// leading values of one output row
    pub fn preview(&self, i: usize) -> Vec<Probability> {
        self.outputs
            .rows()
            .nth(i)
            .map(|row| row.iter().take(crate::PREVIEW_VALUES).copied().collect())
            .unwrap_or_default()
    }
}

/// four decimals, `[a, b, ...]`
pub fn rounded(values: &[Probability]) -> String {
    let inner = values
        .iter()
        .map(|v| format!("{:.4}", v))
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{}]", inner)
}

impl std::fmt::Display for Predictions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "[{}] preds shape {:?}", self.label, self.outputs.shape())?;
        for (i, (name, argmax)) in self.names.iter().zip(self.argmax()).enumerate() {
            writeln!(
                f,
                "[{}] {} -> argmax {} vals (first {}): {}",
                self.label,
                name,
                argmax,
                crate::PREVIEW_VALUES,
                rounded(&self.preview(i))
            )?;
        }
        write!(f, "[{}] row sums {}", self.label, rounded(&self.sums()))
    }
}
