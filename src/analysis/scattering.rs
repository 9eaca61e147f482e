//! # 散射数据
//!
//! X 射线原子形状因子（Cromer-Mann 四高斯拟合）与中子相干散射长度，
//! 供 Faber-Ziman 加权使用。
//!
//! ## 公式
//! f(s) = Σᵢ aᵢ exp(-bᵢ s²) + c，其中 s = sin(θ)/λ = q / 4π
//!
//! ## 数据来源
//! - International Tables for Crystallography, Vol. C, Table 6.1.1.4
//! - 中子散射长度：NIST Center for Neutron Research, Neutron scattering lengths and cross sections
//!
//! ## 依赖关系
//! - 被 `analysis/structure_factor.rs` 调用
//! - 纯静态数据

use crate::error::{MdlabError, Result};

use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::LazyLock;

/// Cromer-Mann 参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormFactorParams {
    pub a: [f64; 4],
    pub b: [f64; 4],
    pub c: f64,
}

impl FormFactorParams {
    /// f(s)，s = sin(θ)/λ (Å⁻¹)
    pub fn at_s(&self, s: f64) -> f64 {
        let s2 = s * s;
        self.c
            + self
                .a
                .iter()
                .zip(&self.b)
                .map(|(a, b)| a * (-b * s2).exp())
                .sum::<f64>()
    }

    /// f(q)，q = 4π sin(θ)/λ (Å⁻¹)
    pub fn at_q(&self, q: f64) -> f64 {
        self.at_s(q / (4.0 * PI))
    }
}

#[rustfmt::skip]
const FORM_FACTOR_TABLE: &[(&str, [f64; 4], [f64; 4], f64)] = &[
    ("H", [0.493002, 0.322912, 0.140191, 0.040810], [10.5109, 26.1257, 3.14236, 57.7997], 0.003038),
    ("He", [0.8734, 0.6309, 0.3112, 0.1780], [9.1037, 3.3568, 22.9276, 0.9821], 0.0064),
    ("Li", [1.1282, 0.7508, 0.6175, 0.4653], [3.9546, 1.0524, 85.3905, 168.261], 0.0377),
    ("Be", [1.5919, 1.1278, 0.5391, 0.7029], [43.6427, 1.8623, 103.483, 0.5420], 0.0385),
    ("B", [2.0545, 1.3326, 1.0979, 0.7068], [23.2185, 1.0210, 60.3498, 0.1403], -0.1932),
    ("C", [2.3100, 1.0200, 1.5886, 0.8650], [20.8439, 10.2075, 0.5687, 51.6512], 0.2156),
    ("N", [12.2126, 3.1322, 2.0125, 1.1663], [0.0057, 9.8933, 28.9975, 0.5826], -11.529),
    ("O", [3.0485, 2.2868, 1.5463, 0.8670], [13.2771, 5.7011, 0.3239, 32.9089], 0.2508),
    ("F", [3.5392, 2.6412, 1.5170, 1.0243], [10.2825, 4.2944, 0.2615, 26.1476], 0.2776),
    ("Na", [4.7626, 3.1736, 1.2674, 1.1128], [3.2850, 8.8422, 0.3136, 129.424], 0.6760),
    ("Mg", [5.4204, 2.1735, 1.2269, 2.3073], [2.8275, 79.2611, 0.3808, 7.1937], 0.8584),
    ("Al", [6.4202, 1.9002, 1.5936, 1.9646], [3.0387, 0.7426, 31.5472, 85.0886], 1.1151),
    ("Si", [6.2915, 3.0353, 1.9891, 1.5410], [2.4386, 32.3337, 0.6785, 81.6937], 1.1407),
    ("P", [6.4345, 4.1791, 1.7800, 1.4908], [1.9067, 27.1570, 0.5260, 68.1645], 1.1149),
    ("S", [6.9053, 5.2034, 1.4379, 1.5863], [1.4679, 22.2151, 0.2536, 56.1720], 0.8669),
    ("Cl", [11.4604, 7.1964, 6.2556, 1.6455], [0.0104, 1.1662, 18.5194, 47.7784], -9.5574),
    ("K", [8.2186, 7.4398, 1.0519, 0.8659], [12.7949, 0.7748, 213.187, 41.6841], 1.4228),
    ("Ca", [8.6266, 7.3873, 1.5899, 1.0211], [10.4421, 0.6599, 85.7484, 178.437], 1.3751),
    ("Ti", [9.7595, 7.3558, 1.6991, 1.9021], [7.8508, 0.5000, 35.6338, 116.105], 1.2807),
    ("V", [10.2971, 7.3511, 2.0703, 2.0571], [6.8657, 0.4385, 26.8938, 102.478], 1.2199),
    ("Cr", [10.6406, 7.3537, 3.3240, 1.4922], [6.1038, 0.3920, 20.2626, 98.7399], 1.1832),
    ("Mn", [11.2819, 7.3573, 3.0193, 2.2441], [5.3409, 0.3432, 17.8674, 83.7543], 1.0896),
    ("Fe", [11.7695, 7.3573, 3.5222, 2.3045], [4.7611, 0.3072, 15.3535, 76.8805], 1.0369),
    ("Co", [12.2841, 7.3409, 4.0034, 2.3488], [4.2791, 0.2784, 13.5359, 71.1692], 1.0118),
    ("Ni", [12.8376, 7.2920, 4.4438, 2.3800], [3.8785, 0.2565, 12.1763, 66.3421], 1.0341),
    ("Cu", [13.3380, 7.1676, 5.6158, 1.6735], [3.5828, 0.2470, 11.3966, 64.8126], 1.1910),
    ("Zn", [14.0743, 7.0318, 5.1652, 2.4100], [3.2655, 0.2333, 10.3163, 58.7097], 1.3041),
    ("Ga", [15.2354, 6.7006, 4.3591, 2.9623], [3.0669, 0.2412, 10.7805, 61.4135], 1.7189),
    ("Ge", [16.0816, 6.3747, 3.7068, 3.6830], [2.8509, 0.2516, 11.4468, 54.7625], 2.1313),
    ("As", [16.6723, 6.0701, 3.4313, 4.2779], [2.6345, 0.2647, 12.9479, 47.7972], 2.531),
    ("Se", [17.0006, 5.8196, 3.9731, 4.3543], [2.4098, 0.2726, 15.2372, 43.8163], 2.8409),
    ("Br", [17.1789, 5.2358, 5.6377, 3.9851], [2.1723, 16.5796, 0.2609, 41.4328], 2.9557),
    ("Rb", [17.5816, 7.6598, 5.8981, 2.7817], [1.7139, 14.7957, 0.1603, 31.2087], 2.0782),
    ("Sr", [17.5663, 9.8184, 5.4220, 2.6694], [1.5564, 14.0988, 0.1664, 132.376], 2.5064),
    ("Y", [17.7760, 10.2946, 5.7263, 3.2656], [1.4029, 12.8006, 0.1255, 104.354], 1.9341),
    ("Zr", [17.8765, 10.9480, 5.4173, 3.6577], [1.2761, 11.9160, 0.1176, 87.6627], 2.0690),
    ("Nb", [17.6142, 12.0144, 4.0418, 3.5334], [1.1886, 11.7660, 0.2047, 69.7957], 3.7553),
    ("Mo", [3.7025, 17.2356, 12.8876, 3.7429], [0.2772, 1.0958, 11.0040, 61.6584], 4.3875),
    ("Ag", [19.2808, 16.6885, 4.8045, 1.0463], [0.6446, 7.4726, 24.6605, 99.8156], 5.1790),
    ("Sn", [19.1889, 19.1005, 4.4585, 2.4663], [5.8303, 0.5031, 26.8909, 83.9571], 4.7821),
    ("Ba", [20.3361, 19.2970, 10.8880, 2.6959], [3.2160, 0.2756, 20.2073, 167.202], 2.7731),
    ("La", [20.5780, 19.5990, 11.3727, 3.2879], [2.9480, 0.2440, 18.7726, 133.124], 2.1461),
    ("Ce", [21.1671, 19.7695, 11.8513, 3.3303], [2.8129, 0.2268, 17.6083, 127.113], 1.8623),
    ("Sm", [24.0042, 19.4258, 13.4396, 2.89604], [2.47274, 0.196451, 14.3996, 128.007], 2.20963),
    ("Ta", [29.2024, 15.2293, 14.5135, 4.76492], [1.77333, 9.37046, 0.295977, 63.3644], 9.24354),
    ("W", [29.0818, 15.43, 14.4327, 5.11982], [1.72029, 9.2259, 0.321703, 57.056], 9.8875),
    ("Pt", [27.0059, 17.7639, 15.7131, 5.7837], [1.51293, 8.81174, 0.424593, 38.6103], 11.6883),
    ("Au", [16.8819, 18.5913, 25.5582, 5.8600], [0.4611, 8.6216, 1.4826, 36.3956], 12.0658),
    ("Pb", [31.0617, 13.0637, 18.4420, 5.9696], [0.6902, 2.3576, 8.6180, 47.2579], 13.4118),
    ("Bi", [33.3689, 12.9510, 16.5877, 6.4692], [0.7040, 2.9238, 8.7937, 48.0093], 13.5782),
];

/// 相干散射长度 (fm)
#[rustfmt::skip]
const NEUTRON_TABLE: &[(&str, f64)] = &[
    ("H", -3.739),
    ("He", 3.26),
    ("Li", -1.9),
    ("Be", 7.79),
    ("B", 5.3),
    ("C", 6.646),
    ("N", 9.36),
    ("O", 5.803),
    ("F", 5.654),
    ("Na", 3.63),
    ("Mg", 5.375),
    ("Al", 3.449),
    ("Si", 4.1491),
    ("P", 5.13),
    ("S", 2.847),
    ("Cl", 9.577),
    ("K", 3.67),
    ("Ca", 4.7),
    ("Ti", -3.438),
    ("V", -0.3824),
    ("Cr", 3.635),
    ("Mn", -3.73),
    ("Fe", 9.45),
    ("Co", 2.49),
    ("Ni", 10.3),
    ("Cu", 7.718),
    ("Zn", 5.68),
    ("Ga", 7.288),
    ("Ge", 8.185),
    ("Y", 7.75),
    ("Zr", 7.16),
    ("Nb", 7.054),
    ("Mo", 6.715),
    ("Ag", 5.922),
    ("Sn", 6.225),
    ("Ba", 5.07),
    ("La", 8.24),
    ("Ce", 4.84),
    ("Sm", 0.8),
    ("Ta", 6.91),
    ("W", 4.86),
    ("Pt", 9.6),
    ("Au", 7.63),
    ("Pb", 9.405),
    ("Bi", 8.532),
];

static FORM_FACTORS: LazyLock<HashMap<&'static str, FormFactorParams>> = LazyLock::new(|| {
    FORM_FACTOR_TABLE
        .iter()
        .map(|&(el, a, b, c)| (el, FormFactorParams { a, b, c }))
        .collect()
});

static NEUTRON_LENGTHS: LazyLock<HashMap<&'static str, f64>> =
    LazyLock::new(|| NEUTRON_TABLE.iter().copied().collect());

/// 元素符号：去掉 "Fe1"、"O2-" 之类标签后缀
pub fn element_symbol(label: &str) -> &str {
    let end = label
        .char_indices()
        .find(|(i, c)| !c.is_ascii_alphabetic() || (*i > 0 && c.is_ascii_uppercase()))
        .map(|(i, _)| i)
        .unwrap_or(label.len());
    &label[..end]
}

/// 元素的 X 射线形状因子参数
pub fn form_factor(element: &str) -> Result<&'static FormFactorParams> {
    FORM_FACTORS
        .get(element_symbol(element))
        .ok_or_else(|| MdlabError::UnknownElement(element.to_string()))
}

/// 元素的中子散射长度 (fm)
pub fn neutron_length(element: &str) -> Result<f64> {
    NEUTRON_LENGTHS
        .get(element_symbol(element))
        .copied()
        .ok_or_else(|| MdlabError::UnknownElement(element.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_factor_at_zero_is_z() {
        for (el, z) in [("Al", 13.0), ("Si", 14.0), ("Fe", 26.0), ("Sm", 62.0), ("W", 74.0)] {
            let f0 = form_factor(el).unwrap().at_q(0.0);
            assert!((f0 - z).abs() < 0.5, "{} f(0) = {}", el, f0);
        }
    }

    #[test]
    fn test_form_factor_decreases() {
        let al = form_factor("Al").unwrap();
        assert!(al.at_q(2.0) < al.at_q(0.5));
        assert!(al.at_q(10.0) < al.at_q(2.0));
    }

    #[test]
    fn test_symbol_from_label() {
        assert_eq!(element_symbol("Fe1"), "Fe");
        assert_eq!(element_symbol("O2-"), "O");
        assert_eq!(element_symbol("Sm"), "Sm");
        assert_eq!(element_symbol("NiAl"), "Ni");
    }

    #[test]
    fn test_neutron_lengths() {
        assert!((neutron_length("Ni").unwrap() - 10.3).abs() < 1e-12);
        assert!(neutron_length("Ti").unwrap() < 0.0);
        assert!(matches!(neutron_length("Xx"), Err(MdlabError::UnknownElement(_))));
        assert!(form_factor("Type1").is_err());
    }
}
