use argh::FromArgs;
use glam::{DVec2, DVec3};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::path::PathBuf;

use pointreg::icp::{
    self as picp, CorrespondenceBackend, CorrespondenceModel, Dimension, KdTreeIndex, Point,
    RegistrationConfig, RigidTransform, StoppingPolicy,
};
use pointreg::lie::{se2::SE2, se3::SE3, so2::SO2};

#[derive(FromArgs)]
/// Register a synthetic point cloud onto a rigidly moved copy of itself
struct Args {
    /// dimension of the problem: 2 or 3
    #[argh(option, default = "Dimension::Three")]
    dimension: Dimension,

    /// number of points of the synthetic cloud
    #[argh(option, default = "1000")]
    num_points: usize,

    /// rotation angle of the ground truth motion in degrees
    #[argh(option, default = "5.0")]
    angle: f64,

    /// translation of the ground truth motion along every axis
    #[argh(option, default = "0.05")]
    translation: f64,

    /// uniform noise added to the destination coordinates
    #[argh(option, default = "0.0")]
    noise: f64,

    /// correspondence backend: kdtree or brute-force
    #[argh(option, default = "CorrespondenceBackend::KdTree")]
    backend: CorrespondenceBackend,

    /// maximum correspondence distance
    #[argh(option, default = "0.2")]
    max_distance: f64,

    /// maximum number of iterations
    #[argh(option, default = "100")]
    max_iterations: usize,

    /// run the correspondence queries in parallel
    #[argh(switch)]
    parallel: bool,

    /// path to a JSON registration config, overrides the registration options above
    #[argh(option)]
    config: Option<PathBuf>,

    /// seed of the point generator
    #[argh(option, default = "42")]
    seed: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let config = match &args.config {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => RegistrationConfig {
            max_distance_squared: args.max_distance * args.max_distance,
            stopping: StoppingPolicy::AnyOf(vec![
                StoppingPolicy::MaxIterations(args.max_iterations),
                StoppingPolicy::RelativeErrorDelta(1e-6),
            ]),
            backend: args.backend,
            parallel: args.parallel,
            ..Default::default()
        },
    };
    config.validate()?;
    log::info!("Registration config: {:?}", config);

    let angle = args.angle.to_radians();
    match args.dimension {
        Dimension::Two => {
            let dst_from_src = SE2::new(SO2::exp(angle), DVec2::splat(args.translation));
            run(&args, &config, dst_from_src)
        }
        Dimension::Three => {
            let dst_from_src =
                SE3::from_axis_angle(DVec3::ONE, angle, DVec3::splat(args.translation));
            run(&args, &config, dst_from_src)
        }
    }
}

fn run<T, const K: usize>(
    args: &Args,
    config: &RegistrationConfig,
    dst_from_src: T,
) -> Result<(), Box<dyn std::error::Error>>
where
    T: RigidTransform<Point = [f64; K]>,
    KdTreeIndex<K>: CorrespondenceModel<[f64; K]>,
{
    let mut rng = StdRng::seed_from_u64(args.seed);

    let source_cloud = (0..args.num_points)
        .map(|_| std::array::from_fn(|_| rng.random_range(-1.0..1.0)))
        .collect::<Vec<[f64; K]>>();
    println!("Source cloud: #{} points", source_cloud.len());

    let target_cloud = source_cloud
        .iter()
        .map(|p| {
            let mut q = dst_from_src.transform_point(p);
            if args.noise > 0.0 {
                q.iter_mut()
                    .for_each(|x| *x += rng.random_range(-args.noise..args.noise));
            }
            q
        })
        .collect::<Vec<_>>();
    println!("Target cloud: #{} points", target_cloud.len());

    let mut transformed_source = source_cloud.clone();
    let now = std::time::Instant::now();
    let result = picp::register(&mut transformed_source, &target_cloud, T::identity(), config)?;
    println!("ICP registration result: {:?}", result);
    println!("Elapsed: {:?}", now.elapsed());

    // distance between the estimated and the ground truth placement of every point
    let rmse = (source_cloud
        .iter()
        .map(|p| {
            result
                .transform
                .transform_point(p)
                .squared_distance(&dst_from_src.transform_point(p))
        })
        .sum::<f64>()
        / source_cloud.len() as f64)
        .sqrt();
    println!("Ground truth RMSE: {:e}", rmse);

    Ok(())
}
