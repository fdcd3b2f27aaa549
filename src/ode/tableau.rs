//! Explicit Runge-Kutta Butcher tableau descriptors, transcribed from
//! `Math/ODE/Tables/*.h`. Each tableau is data, not behavior: `ode::solver`
//! interprets it generically.

use serde::{Deserialize, Serialize};

/// A Butcher tableau for an explicit RK method: `c` (nodes), `a` (strictly
/// lower triangular stage coefficients, `a[i]` has `i` entries), `b`
/// (weights). An adaptive tableau additionally carries one or more error
/// estimator rows; a row of length `stage_count + 1` denotes a "dual
/// correction" formula that evaluates one extra derivative at the
/// accepted point (per the Dormand-Prince/Tsitouras family).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ButcherTableau {
    pub name: &'static str,
    pub accuracy_order: usize,
    pub stage_count: usize,
    pub c: Vec<f64>,
    pub a: Vec<Vec<f64>>,
    pub b: Vec<f64>,
    pub is_adaptive: bool,
    pub error_row: Option<Vec<f64>>,
    pub error_accuracy_order: Option<usize>,
    pub dense_output_supported: bool,
    pub interpolation_order: Option<usize>,
    /// `dense_output_coefficients[i]` holds the Horner-ordered polynomial
    /// coefficients (ascending power, constant term dropped since it's
    /// always `0` at `theta=0`) contributing `k_i`'s share of the dense
    /// output interpolant.
    pub dense_output_coefficients: Option<Vec<Vec<f64>>>,
}

pub fn euler1() -> ButcherTableau {
    ButcherTableau {
        name: "Euler1",
        accuracy_order: 1,
        stage_count: 1,
        c: vec![0.0],
        a: vec![vec![]],
        b: vec![1.0],
        is_adaptive: false,
        error_row: None,
        error_accuracy_order: None,
        dense_output_supported: false,
        interpolation_order: None,
        dense_output_coefficients: None,
    }
}

pub fn bogacki_shampine32() -> ButcherTableau {
    ButcherTableau {
        name: "BogackiShampine32",
        accuracy_order: 3,
        stage_count: 4,
        c: vec![0.0, 0.5, 0.75, 1.0],
        a: vec![
            vec![],
            vec![0.5],
            vec![0.0, 0.75],
            vec![0.2222222222222222, 0.3333333333333333, 0.4444444444444444],
        ],
        b: vec![0.2222222222222222, 0.3333333333333333, 0.4444444444444444, 0.0],
        is_adaptive: true,
        error_row: Some(vec![
            0.06944444444444445,
            -0.08333333333333333,
            -0.1111111111111111,
            0.125,
        ]),
        error_accuracy_order: Some(2),
        dense_output_supported: false,
        interpolation_order: None,
        dense_output_coefficients: None,
    }
}

pub fn dormand_prince54() -> ButcherTableau {
    ButcherTableau {
        name: "DormandPrince54",
        accuracy_order: 5,
        stage_count: 6,
        c: vec![0.0, 0.2, 0.3, 0.8, 0.8888888888888888, 1.0],
        a: vec![
            vec![],
            vec![0.2],
            vec![0.075, 0.225],
            vec![0.9777777777777777, -3.733333333333333, 3.555555555555555],
            vec![
                2.952598689224204,
                -11.59579332418839,
                9.822892851699436,
                -0.2908093278463649,
            ],
            vec![
                2.846275252525253,
                -10.75757575757576,
                8.906422717743473,
                0.2784090909090909,
                -0.2735313036020583,
            ],
        ],
        b: vec![
            0.09114583333333333,
            0.0,
            0.4492362982929021,
            0.6510416666666666,
            -0.322376179245283,
            0.130952380952381,
        ],
        is_adaptive: true,
        error_row: Some(vec![
            -0.0012326388888888888,
            0.0,
            0.0042527702905061394,
            -0.03697916666666667,
            0.05086379716981132,
            -0.0419047619047619,
            0.025,
        ]),
        error_accuracy_order: Some(4),
        dense_output_supported: true,
        interpolation_order: Some(4),
        dense_output_coefficients: Some(vec![
            vec![0.0, 1.0, -2.853580065386284, 3.0717434641059, -1.127017565386284],
            vec![],
            vec![0.0, 0.0, 4.023133379230305, -6.249321565289, 2.675424484351598],
            vec![0.0, 0.0, -3.732401961588505, 10.06897058984368, -5.685526961588504],
            vec![0.0, 0.0, 2.554803830184942, -6.399112377351017, 3.521932367920791],
            vec![0.0, 0.0, -1.374424114218603, 3.272657752246729, -1.767281257075746],
            vec![0.0, 0.0, 1.382468931778144, -3.764937863556288, 2.382468931778144],
        ]),
    }
}

pub fn tsitouras_papakostas87() -> ButcherTableau {
    ButcherTableau {
        name: "TsitourasPapakostas87",
        accuracy_order: 8,
        stage_count: 13,
        c: vec![
            0.0,
            0.06338028169014084,
            0.1027879458763643,
            0.15418191881454646,
            0.3875968992248062,
            0.4657534246575342,
            0.1554054054054054,
            1.0070921985815602,
            0.876141078561489,
            0.9120879120879121,
            0.959731543624161,
            1.0,
            1.0,
        ],
        a: vec![
            vec![],
            vec![0.06338028169014084],
            vec![0.0194389804273365, 0.08334896544902781],
            vec![0.03854547970363662, 0.0, 0.1156364391109098],
            vec![0.394365577701125, 0.0, -1.481871932167337, 1.475103253691019],
            vec![0.0459944891076982, 0.0, 0.0, 0.2323507062639547, 0.1874082292858813],
            vec![
                0.06005228953244051,
                0.0,
                0.0,
                0.1122038319463678,
                -0.03357232951906142,
                0.01672161344565858,
            ],
            vec![
                -1.573329273208686,
                0.0,
                0.0,
                -1.316708773022366,
                -11.72351529618177,
                9.107825028173872,
                6.512820512820513,
            ],
            vec![
                -0.4810762562439125,
                0.0,
                0.0,
                -6.65061036074639,
                -4.530206099782572,
                3.894414525020157,
                8.634217645525526,
                0.009401624788681498,
            ],
            vec![
                -0.7754121446230569,
                0.0,
                0.0,
                -7.996604718235832,
                -6.726558607230182,
                5.532184454327406,
                10.89757332024991,
                0.0200916502800454,
                -0.03918604268037686,
            ],
            vec![
                -1.189636324544999,
                0.0,
                0.0,
                -7.128368483301214,
                -9.53722789710108,
                7.574470108980868,
                11.26748638207092,
                0.05100980122305832,
                0.08019413469508256,
                -0.1581961783984735,
            ],
            vec![
                -0.3920003904712727,
                0.0,
                0.0,
                3.916659042493856,
                -2.801745928908056,
                2.441204566481742,
                -2.418365577882472,
                -0.3394332629003293,
                0.1949645038310336,
                -0.1943717676250815,
                0.5930888149805791,
            ],
            vec![
                -1.484706308129189,
                0.0,
                0.0,
                -2.390723588981498,
                -11.18430677284053,
                8.720804667459817,
                7.33673830753461,
                0.01289874999394761,
                0.0425832898426577,
                -0.05328834487981156,
                0.0,
                0.0,
            ],
        ],
        b: vec![
            0.04441161093250152,
            0.0,
            0.0,
            0.0,
            0.0,
            0.35395063113733116,
            0.2485219684184965,
            -0.3326913171720666,
            1.921248828652836,
            -2.7317783000882523,
            1.4012004409899175,
            0.0951361371292365,
            0.0,
        ],
        is_adaptive: true,
        error_row: Some(vec![
            -7.259091782802626e-5,
            0.0,
            0.0,
            0.0,
            0.0,
            -0.0010728916072503584,
            0.0002666668345794398,
            2.091533979096395,
            0.3213186752428666,
            -0.921013671395284,
            1.4012004409899175,
            0.0951361371292365,
            -2.9872967453726327,
        ]),
        error_accuracy_order: Some(7),
        dense_output_supported: false,
        interpolation_order: None,
        dense_output_coefficients: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_consistent(t: &ButcherTableau) {
        assert_eq!(t.c.len(), t.stage_count);
        assert_eq!(t.a.len(), t.stage_count);
        for (i, row) in t.a.iter().enumerate() {
            assert_eq!(row.len(), i);
        }
        assert_eq!(t.b.len(), t.stage_count);
    }

    #[test]
    fn euler_tableau_is_consistent() {
        assert_consistent(&euler1());
    }

    #[test]
    fn bogacki_shampine_weights_sum_to_one() {
        let t = bogacki_shampine32();
        assert_consistent(&t);
        let sum: f64 = t.b.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn dormand_prince_weights_sum_to_one() {
        let t = dormand_prince54();
        assert_consistent(&t);
        let sum: f64 = t.b.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert_eq!(t.error_row.as_ref().unwrap().len(), t.stage_count + 1);
    }

    #[test]
    fn tsitouras_papakostas_weights_sum_to_one() {
        let t = tsitouras_papakostas87();
        assert_consistent(&t);
        let sum: f64 = t.b.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }
}
