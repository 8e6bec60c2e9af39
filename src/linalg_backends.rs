// src/linalg_backends.rs

use ndarray::{Array1, Array2};
use std::marker::PhantomData;

use crate::error::ThreadSafeStdError;

/// Singular values and right singular vectors of a matrix.
///
/// The discriminant solver never needs the left singular vectors, so backends
/// skip them; for tall data matrices U would be the largest object by far.
#[derive(Debug)]
pub struct SingularSpectrum<F: 'static> {
    /// Singular values in descending order, length `min(nrows, ncols)`.
    pub singular_values: Array1<F>,
    /// V^T. Row `i` is the right singular vector for `singular_values[i]`.
    /// At least `singular_values.len()` rows; the ndarray-linalg backend returns the full square V^T.
    pub vt: Array2<F>,
}

/// Trait for the right-hand side of a Singular Value Decomposition.
pub trait BackendSVD<F: 'static + Copy + Send + Sync> {
    fn right_svd(&self, matrix: Array2<F>) -> Result<SingularSpectrum<F>, ThreadSafeStdError>;
}

/// Dispatches to the linear algebra backend selected by compile-time features.
#[derive(Debug, Default, Copy, Clone)]
pub struct LinAlgBackendProvider<F: 'static + Copy + Send + Sync> {
    _phantom: PhantomData<F>,
}

impl<F: 'static + Copy + Send + Sync> LinAlgBackendProvider<F> {
    pub fn new() -> Self {
        Self { _phantom: PhantomData }
    }
}

// --- ndarray-linalg (LAPACK) backend ---
use ndarray_linalg::SVDInto as NdLinalgSVDInto;

#[derive(Debug, Default, Copy, Clone)]
pub struct NdarrayLinAlgBackend;

fn to_dyn_error<E: std::error::Error + Send + Sync + 'static>(e: E) -> ThreadSafeStdError {
    Box::new(e)
}

impl BackendSVD<f64> for NdarrayLinAlgBackend {
    fn right_svd(&self, matrix: Array2<f64>) -> Result<SingularSpectrum<f64>, ThreadSafeStdError> {
        let (nrows, ncols) = matrix.dim();
        if nrows == 0 || ncols == 0 {
            return Ok(SingularSpectrum {
                singular_values: Array1::zeros(0),
                vt: Array2::zeros((0, ncols)),
            });
        }
        let (_u, singular_values, vt) = matrix.svd_into(false, true).map_err(to_dyn_error)?;
        let vt = vt.ok_or("SVD did not return right singular vectors")?;
        Ok(SingularSpectrum { singular_values, vt })
    }
}

#[cfg(feature = "backend_faer")]
mod faer_specific_code {
    use super::{BackendSVD, SingularSpectrum};
    use crate::error::ThreadSafeStdError;
    use faer::linalg::solvers::Svd as FaerSolverSvd;
    use ndarray::{Array1, Array2};

    #[derive(Debug, Default, Copy, Clone)]
    pub struct FaerLinAlgBackend;

    impl BackendSVD<f64> for FaerLinAlgBackend {
        fn right_svd(&self, matrix: Array2<f64>) -> Result<SingularSpectrum<f64>, ThreadSafeStdError> {
            let (nrows, ncols) = matrix.dim();
            if nrows == 0 || ncols == 0 {
                return Ok(SingularSpectrum {
                    singular_values: Array1::zeros(0),
                    vt: Array2::zeros((0, ncols)),
                });
            }
            let faer_matrix = faer::Mat::<f64>::from_fn(nrows, ncols, |i, j| matrix[[i, j]]);
            let svd = FaerSolverSvd::new_thin(faer_matrix.as_ref())
                .map_err(|e| format!("Faer SVD computation failed: {:?}", e))?;

            let s_diag = svd.S();
            let s_col = s_diag.column_vector();
            let k = s_col.nrows();
            let singular_values = Array1::from_shape_fn(k, |i| unsafe { *s_col.get_unchecked(i) });

            let v = svd.V();
            let vt = Array2::from_shape_fn((v.ncols(), v.nrows()), |(i, j)| unsafe {
                *v.get_unchecked(j, i)
            });
            Ok(SingularSpectrum { singular_values, vt })
        }
    }
}

#[cfg(feature = "backend_faer")]
impl<F> BackendSVD<F> for LinAlgBackendProvider<F>
where
    F: 'static + Copy + Send + Sync,
    NdarrayLinAlgBackend: BackendSVD<F>,
    faer_specific_code::FaerLinAlgBackend: BackendSVD<F>,
{
    fn right_svd(&self, matrix: Array2<F>) -> Result<SingularSpectrum<F>, ThreadSafeStdError> {
        faer_specific_code::FaerLinAlgBackend.right_svd(matrix)
    }
}

#[cfg(not(feature = "backend_faer"))]
impl<F> BackendSVD<F> for LinAlgBackendProvider<F>
where
    F: 'static + Copy + Send + Sync,
    NdarrayLinAlgBackend: BackendSVD<F>,
{
    fn right_svd(&self, matrix: Array2<F>) -> Result<SingularSpectrum<F>, ThreadSafeStdError> {
        NdarrayLinAlgBackend.right_svd(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn singular_values_are_descending_and_reconstruct_gram_matrix() {
        let matrix = array![[3.0, 1.0], [1.0, 3.0], [0.0, 2.0]];
        let backend = LinAlgBackendProvider::<f64>::new();
        let spectrum = backend.right_svd(matrix.clone()).unwrap();
        let s = &spectrum.singular_values;
        assert_eq!(s.len(), 2);
        assert!(s[0] >= s[1]);

        // A^T A = V diag(s^2) V^T
        let v = spectrum.vt.t();
        let mut reconstructed = Array2::<f64>::zeros((2, 2));
        for k in 0..2 {
            let vk = v.column(k);
            for i in 0..2 {
                for j in 0..2 {
                    reconstructed[[i, j]] += s[k] * s[k] * vk[i] * vk[j];
                }
            }
        }
        let gram = matrix.t().dot(&matrix);
        for (a, b) in reconstructed.iter().zip(gram.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn empty_matrix_has_empty_spectrum() {
        let backend = LinAlgBackendProvider::<f64>::new();
        let spectrum = backend.right_svd(Array2::zeros((0, 3))).unwrap();
        assert_eq!(spectrum.singular_values.len(), 0);
        assert_eq!(spectrum.vt.dim(), (0, 3));
    }
}
